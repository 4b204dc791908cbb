use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};

use crate::domain::{Role, UserId};
use crate::entities::users;

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,
    pub email_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether a lock is in force at `now`. An elapsed lock does not count.
    #[must_use]
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: UserId::new(model.id),
            email: model.email,
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
            role: model.role,
            is_active: model.is_active,
            is_verified: model.is_verified,
            email_verified: model.email_verified,
            verified_at: model.verified_at,
            failed_login_attempts: model.failed_login_attempts,
            locked_until: model.locked_until,
            last_login: model.last_login,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Fields required to create an account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_verified: bool,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, new_user: NewUser, now: DateTime<Utc>) -> Result<User> {
        let model = users::ActiveModel {
            id: Set(UserId::generate().value()),
            email: Set(new_user.email),
            username: Set(new_user.username),
            password_hash: Set(new_user.password_hash),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            role: Set(new_user.role),
            is_active: Set(true),
            is_verified: Set(new_user.is_verified),
            email_verified: Set(new_user.is_verified),
            verified_at: Set(new_user.is_verified.then_some(now)),
            failed_login_attempts: Set(0),
            locked_until: Set(None),
            last_login: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert user")?;

        Ok(User::from(model))
    }

    pub async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    /// Get user by email together with the stored password hash (for login)
    pub async fn find_by_email_with_password(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(split_password))
    }

    /// Get user by ID together with the stored password hash (for password change)
    pub async fn find_by_id_with_password(&self, id: UserId) -> Result<Option<(User, String)>> {
        let user = users::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(split_password))
    }

    pub async fn exists_by_email(&self, email: &str) -> Result<bool> {
        let count = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .count(&self.conn)
            .await
            .context("Failed to count users by email")?;

        Ok(count > 0)
    }

    pub async fn exists_by_username(&self, username: &str) -> Result<bool> {
        let count = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .count(&self.conn)
            .await
            .context("Failed to count users by username")?;

        Ok(count > 0)
    }

    pub async fn update_password(
        &self,
        id: UserId,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Result<()> {
        users::ActiveModel {
            id: Set(id.value()),
            password_hash: Set(password_hash),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(&self.conn)
        .await
        .context("Failed to update password")?;

        Ok(())
    }

    /// Count a failed login and lock the account once `max_attempts` is reached.
    ///
    /// The increment is a single `SET n = n + 1` statement inside a transaction,
    /// so concurrent failures are never lost. Returns the new count.
    pub async fn record_failed_login(
        &self,
        id: UserId,
        now: DateTime<Utc>,
        max_attempts: u32,
        lockout: chrono::Duration,
    ) -> Result<i32> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to start transaction")?;

        users::Entity::update_many()
            .col_expr(
                users::Column::FailedLoginAttempts,
                Expr::col(users::Column::FailedLoginAttempts).add(1),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(id.value()))
            .exec(&txn)
            .await
            .context("Failed to increment failed login attempts")?;

        let model = users::Entity::find_by_id(id.value())
            .one(&txn)
            .await
            .context("Failed to re-read user after failed login")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let attempts = model.failed_login_attempts;
        let threshold = i32::try_from(max_attempts).unwrap_or(i32::MAX);

        if attempts >= threshold {
            let mut active: users::ActiveModel = model.into();
            active.locked_until = Set(Some(now + lockout));
            active
                .update(&txn)
                .await
                .context("Failed to lock account")?;
        }

        txn.commit().await.context("Failed to commit failed login")?;

        Ok(attempts)
    }

    pub async fn record_successful_login(&self, id: UserId, now: DateTime<Utc>) -> Result<User> {
        let model = users::ActiveModel {
            id: Set(id.value()),
            failed_login_attempts: Set(0),
            locked_until: Set(None),
            last_login: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(&self.conn)
        .await
        .context("Failed to record successful login")?;

        Ok(User::from(model))
    }

    /// Reset the failure counter and drop any lock.
    pub async fn clear_lock(&self, id: UserId, now: DateTime<Utc>) -> Result<()> {
        users::ActiveModel {
            id: Set(id.value()),
            failed_login_attempts: Set(0),
            locked_until: Set(None),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(&self.conn)
        .await
        .context("Failed to clear account lock")?;

        Ok(())
    }

    pub async fn mark_verified(&self, id: UserId, now: DateTime<Utc>) -> Result<User> {
        let model = users::ActiveModel {
            id: Set(id.value()),
            is_verified: Set(true),
            email_verified: Set(true),
            verified_at: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(&self.conn)
        .await
        .context("Failed to mark user verified")?;

        Ok(User::from(model))
    }

    pub async fn set_active(&self, id: UserId, active: bool, now: DateTime<Utc>) -> Result<User> {
        let model = users::ActiveModel {
            id: Set(id.value()),
            is_active: Set(active),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(&self.conn)
        .await
        .context("Failed to update account status")?;

        Ok(User::from(model))
    }

    pub async fn set_role(&self, id: UserId, role: Role, now: DateTime<Utc>) -> Result<User> {
        let model = users::ActiveModel {
            id: Set(id.value()),
            role: Set(role),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(&self.conn)
        .await
        .context("Failed to update role")?;

        Ok(User::from(model))
    }
}

fn split_password(model: users::Model) -> (User, String) {
    let password_hash = model.password_hash.clone();
    (User::from(model), password_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use chrono::TimeZone;

    fn new_user(email: &str, username: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            username: username.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            role: Role::User,
            is_verified: false,
        }
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn create_and_lookup() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let repo = store.users();

        let user = repo.create(new_user("a@x.com", "alice"), at(0)).await.unwrap();
        assert_eq!(user.role, Role::User);
        assert!(user.is_active);
        assert!(!user.is_verified);
        assert_eq!(user.failed_login_attempts, 0);

        assert_eq!(repo.find_by_id(user.id).await.unwrap(), Some(user.clone()));
        assert!(repo.exists_by_email("a@x.com").await.unwrap());
        assert!(repo.exists_by_username("alice").await.unwrap());
        assert!(!repo.exists_by_username("bob").await.unwrap());

        let (_, hash) = repo
            .find_by_email_with_password("a@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hash, "$argon2id$placeholder");
    }

    #[tokio::test]
    async fn failed_logins_lock_at_threshold() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let repo = store.users();
        let user = repo.create(new_user("a@x.com", "alice"), at(0)).await.unwrap();
        let lockout = chrono::Duration::minutes(15);

        for expected in 1..=4 {
            let count = repo
                .record_failed_login(user.id, at(1), 5, lockout)
                .await
                .unwrap();
            assert_eq!(count, expected);
        }
        let still_open = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert!(still_open.locked_until.is_none());

        let count = repo
            .record_failed_login(user.id, at(2), 5, lockout)
            .await
            .unwrap();
        assert_eq!(count, 5);

        let locked = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(locked.locked_until, Some(at(17)));
        assert!(locked.is_locked_at(at(16)));
        assert!(!locked.is_locked_at(at(17)));

        let after = repo.record_successful_login(user.id, at(20)).await.unwrap();
        assert_eq!(after.failed_login_attempts, 0);
        assert!(after.locked_until.is_none());
        assert_eq!(after.last_login, Some(at(20)));
    }

    #[tokio::test]
    async fn verification_and_admin_updates() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let repo = store.users();
        let user = repo.create(new_user("a@x.com", "alice"), at(0)).await.unwrap();

        let verified = repo.mark_verified(user.id, at(5)).await.unwrap();
        assert!(verified.is_verified);
        assert!(verified.email_verified);
        assert_eq!(verified.verified_at, Some(at(5)));

        let inactive = repo.set_active(user.id, false, at(6)).await.unwrap();
        assert!(!inactive.is_active);

        let admin = repo.set_role(user.id, Role::Admin, at(7)).await.unwrap();
        assert_eq!(admin.role, Role::Admin);
    }
}
