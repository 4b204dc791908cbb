use chrono::Utc;

use crate::config::Config;
use crate::db::{NewUser, Store};
use crate::domain::Role;
use crate::services::CredentialStore;
use crate::services::validation::check_password;

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin12345";
pub const DEFAULT_USER_PASSWORD: &str = "user12345";

struct SeedAccount<'a> {
    email: &'static str,
    username: &'static str,
    first_name: &'static str,
    role: Role,
    password: &'a str,
}

pub async fn cmd_seed(
    config: &Config,
    admin_password: &str,
    user_password: &str,
) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_url).await?;
    let credentials = CredentialStore::from_config(&config.security)?;

    let accounts = [
        SeedAccount {
            email: "admin@tradeauth.local",
            username: "admin",
            first_name: "Admin",
            role: Role::SuperAdmin,
            password: admin_password,
        },
        SeedAccount {
            email: "user@tradeauth.local",
            username: "testuser",
            first_name: "Test",
            role: Role::User,
            password: user_password,
        },
    ];

    for account in accounts {
        if seed_account(&store, &credentials, &account).await? {
            println!("✓ Created {} ({})", account.email, account.role);
        } else {
            println!("  {} already exists, skipped", account.email);
        }
    }

    Ok(())
}

async fn seed_account(
    store: &Store,
    credentials: &CredentialStore,
    account: &SeedAccount<'_>,
) -> anyhow::Result<bool> {
    let users = store.users();
    if users.exists_by_email(account.email).await?
        || users.exists_by_username(account.username).await?
    {
        return Ok(false);
    }

    if let Err(message) = check_password(account.password) {
        anyhow::bail!("Password for {} rejected: {message}", account.email);
    }

    let password_hash = credentials.hash_async(account.password.to_string()).await?;

    users
        .create(
            NewUser {
                email: account.email.to_string(),
                username: account.username.to_string(),
                password_hash,
                first_name: account.first_name.to_string(),
                last_name: "User".to_string(),
                role: account.role,
                is_verified: true,
            },
            Utc::now(),
        )
        .await?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let config = Config::for_environment(Environment::Testing);
        let store = Store::new("sqlite::memory:").await.unwrap();
        let credentials = CredentialStore::from_config(&config.security).unwrap();

        let admin = SeedAccount {
            email: "admin@tradeauth.local",
            username: "admin",
            first_name: "Admin",
            role: Role::SuperAdmin,
            password: DEFAULT_ADMIN_PASSWORD,
        };

        assert!(seed_account(&store, &credentials, &admin).await.unwrap());
        assert!(!seed_account(&store, &credentials, &admin).await.unwrap());

        let created = store
            .users()
            .find_by_email("admin@tradeauth.local")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.role, Role::SuperAdmin);
        assert!(created.is_verified);
    }

    #[tokio::test]
    async fn weak_seed_password_is_rejected() {
        let config = Config::for_environment(Environment::Testing);
        let store = Store::new("sqlite::memory:").await.unwrap();
        let credentials = CredentialStore::from_config(&config.security).unwrap();

        let weak = SeedAccount {
            email: "user@tradeauth.local",
            username: "testuser",
            first_name: "Test",
            role: Role::User,
            password: "short",
        };

        assert!(seed_account(&store, &credentials, &weak).await.is_err());
    }
}
