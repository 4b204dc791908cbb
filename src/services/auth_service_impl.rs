//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::SecurityConfig;
use crate::db::{NewUser, Store, User, generate_account_token, hash_account_token};
use crate::domain::{Role, TokenPurpose, UserId};
use crate::services::auth_service::{
    ACCOUNT_DEACTIVATED, ACCOUNT_LOCKED, AuthError, AuthService, AuthSession,
    CURRENT_PASSWORD_INCORRECT, INVALID_CREDENTIALS, INVALID_RESET_TOKEN,
    INVALID_VERIFICATION_TOKEN, PASSWORD_UNCHANGED, RegisterInput, USER_NOT_FOUND,
    is_unique_violation,
};
use crate::services::clock::Clock;
use crate::services::credentials::CredentialStore;
use crate::services::notifier::Notifier;
use crate::services::tokens::{TokenPair, TokenService};
use crate::services::validation::{
    self, FieldErrors, check_email, check_name, check_password, check_username, collect,
    normalize_email,
};

pub struct SeaOrmAuthService {
    store: Store,
    credentials: CredentialStore,
    tokens: Arc<TokenService>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        credentials: CredentialStore,
        tokens: Arc<TokenService>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        security: SecurityConfig,
    ) -> Self {
        Self {
            store,
            credentials,
            tokens,
            clock,
            notifier,
            security,
        }
    }

    fn session(&self, user: User) -> Result<AuthSession, AuthError> {
        let tokens = self.tokens.issue(&user)?;
        Ok(AuthSession { user, tokens })
    }

    /// Store the hash of a fresh token and return the raw token.
    async fn issue_account_token(
        &self,
        user: &User,
        purpose: TokenPurpose,
    ) -> Result<String, AuthError> {
        let ttl = match purpose {
            TokenPurpose::PasswordReset => self.security.password_reset_ttl(),
            TokenPurpose::EmailVerification => self.security.email_verification_ttl(),
        };

        let token = generate_account_token();
        self.store
            .account_tokens()
            .issue(
                user.id,
                purpose,
                hash_account_token(&token),
                self.clock.now(),
                ttl,
            )
            .await?;

        info!(user_id = %user.id, purpose = %purpose, "Account token issued");
        Ok(token)
    }

    async fn send_verification(&self, user: &User) -> Result<(), AuthError> {
        let token = self
            .issue_account_token(user, TokenPurpose::EmailVerification)
            .await?;
        self.notifier
            .verification_requested(&user.email, &token)
            .await;
        Ok(())
    }

    fn validate_registration(input: &RegisterInput) -> Result<(), AuthError> {
        let mut errors = FieldErrors::new();
        collect(&mut errors, "email", check_email(&input.email));
        collect(&mut errors, "username", check_username(&input.username));
        collect(&mut errors, "password", check_password(&input.password));
        collect(
            &mut errors,
            "first_name",
            check_name(
                &input.first_name,
                "First name is required",
                "First name must be less than 100 characters",
            ),
        );
        collect(
            &mut errors,
            "last_name",
            check_name(
                &input.last_name,
                "Last name is required",
                "Last name must be less than 100 characters",
            ),
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AuthError::Validation(errors))
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, input: RegisterInput) -> Result<AuthSession, AuthError> {
        Self::validate_registration(&input)?;

        let email = normalize_email(&input.email);
        let username = input.username.trim().to_string();
        let users = self.store.users();

        if users.exists_by_email(&email).await? {
            return Err(AuthError::Conflict(format!(
                "Email '{email}' is already registered"
            )));
        }

        if users.exists_by_username(&username).await? {
            return Err(AuthError::Conflict(format!(
                "Username '{username}' is already taken"
            )));
        }

        let password_hash = self.credentials.hash_async(input.password).await?;

        let new_user = NewUser {
            email: email.clone(),
            username: username.clone(),
            password_hash,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            role: Role::User,
            is_verified: false,
        };

        // A concurrent registration can still win the race past the checks above
        let user = match users.create(new_user, self.clock.now()).await {
            Ok(user) => user,
            Err(err) if is_unique_violation(&err) => {
                return Err(AuthError::Conflict(format!(
                    "Email '{email}' or username '{username}' is already in use"
                )));
            }
            Err(err) => return Err(err.into()),
        };

        info!(user_id = %user.id, username = %user.username, "User registered");

        if self.security.issue_verification_on_register {
            self.send_verification(&user).await?;
        }

        self.session(user)
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email);
        let users = self.store.users();
        let now = self.clock.now();

        let Some((user, password_hash)) = users.find_by_email_with_password(&email).await? else {
            debug!("Login attempt for unknown email");
            return Err(AuthError::authentication(INVALID_CREDENTIALS));
        };

        if let Some(locked_until) = user.locked_until {
            if user.is_locked_at(now) {
                warn!(user_id = %user.id, %locked_until, "Login attempt on locked account");
                return Err(AuthError::authentication(ACCOUNT_LOCKED));
            }
            users.clear_lock(user.id, now).await?;
            info!(user_id = %user.id, "Account lock expired");
        }

        let valid = self
            .credentials
            .verify_async(password.to_string(), password_hash)
            .await?;

        if !valid {
            let attempts = users
                .record_failed_login(
                    user.id,
                    now,
                    self.security.max_failed_logins,
                    self.security.lockout_duration(),
                )
                .await?;

            if attempts >= i32::try_from(self.security.max_failed_logins).unwrap_or(i32::MAX) {
                warn!(user_id = %user.id, attempts, "Account locked after failed logins");
            } else {
                info!(user_id = %user.id, attempts, "Failed login");
            }

            return Err(AuthError::authentication(INVALID_CREDENTIALS));
        }

        if !user.is_active {
            return Err(AuthError::authentication(ACCOUNT_DEACTIVATED));
        }

        let user = users.record_successful_login(user.id, now).await?;
        info!(user_id = %user.id, "User logged in");

        self.session(user)
    }

    async fn refresh_tokens(&self, user_id: UserId) -> Result<TokenPair, AuthError> {
        let user = self.current_user(user_id).await?;
        Ok(self.tokens.refresh(&user)?)
    }

    async fn current_user(&self, user_id: UserId) -> Result<User, AuthError> {
        let user = self
            .store
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::authentication(USER_NOT_FOUND))?;

        if !user.is_active {
            return Err(AuthError::authentication(ACCOUNT_DEACTIVATED));
        }

        Ok(user)
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        if let Err(message) = check_email(email) {
            return Err(AuthError::Validation(validation::single("email", message)));
        }

        let email = normalize_email(email);
        let user = self.store.users().find_by_email(&email).await?;

        let Some(user) = user.filter(|u| u.is_active) else {
            debug!("Password reset requested for unknown or inactive account");
            return Ok(());
        };

        let token = self
            .issue_account_token(&user, TokenPurpose::PasswordReset)
            .await?;
        self.notifier
            .password_reset_requested(&user.email, &token)
            .await;

        Ok(())
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        if let Err(message) = check_password(new_password) {
            return Err(AuthError::Validation(validation::single(
                "password", message,
            )));
        }

        let now = self.clock.now();
        let token_hash = hash_account_token(token.trim());
        let tokens = self.store.account_tokens();
        let invalid = || AuthError::Validation(validation::single("token", INVALID_RESET_TOKEN));

        // Reject unusable tokens before hashing
        if tokens
            .find_active(TokenPurpose::PasswordReset, &token_hash, now)
            .await?
            .is_none()
        {
            return Err(invalid());
        }

        let password_hash = self
            .credentials
            .hash_async(new_password.to_string())
            .await?;

        let user_id = tokens
            .redeem_password_reset(&token_hash, password_hash, now)
            .await?
            .ok_or_else(invalid)?;

        info!(user_id = %user_id, "Password reset");
        Ok(())
    }

    async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let (user, password_hash) = self
            .store
            .users()
            .find_by_id_with_password(user_id)
            .await?
            .ok_or_else(|| AuthError::authentication(USER_NOT_FOUND))?;

        if !user.is_active {
            return Err(AuthError::authentication(ACCOUNT_DEACTIVATED));
        }

        let valid = self
            .credentials
            .verify_async(current_password.to_string(), password_hash)
            .await?;
        if !valid {
            return Err(AuthError::authentication(CURRENT_PASSWORD_INCORRECT));
        }

        if let Err(message) = check_password(new_password) {
            return Err(AuthError::Validation(validation::single(
                "new_password",
                message,
            )));
        }

        if current_password == new_password {
            return Err(AuthError::Validation(validation::single(
                "new_password",
                PASSWORD_UNCHANGED,
            )));
        }

        let new_hash = self
            .credentials
            .hash_async(new_password.to_string())
            .await?;
        self.store
            .users()
            .update_password(user.id, new_hash, self.clock.now())
            .await?;

        info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    async fn verify_email(&self, token: &str) -> Result<User, AuthError> {
        let now = self.clock.now();
        let user_id = self
            .store
            .account_tokens()
            .consume(
                TokenPurpose::EmailVerification,
                &hash_account_token(token.trim()),
                now,
            )
            .await?
            .ok_or_else(|| {
                AuthError::Validation(validation::single("token", INVALID_VERIFICATION_TOKEN))
            })?;

        let user = self.store.users().mark_verified(user_id, now).await?;
        info!(user_id = %user.id, "Email verified");

        Ok(user)
    }

    async fn resend_verification(&self, user_id: UserId) -> Result<bool, AuthError> {
        let user = self.current_user(user_id).await?;

        if user.is_verified {
            return Ok(false);
        }

        self.send_verification(&user).await?;
        Ok(true)
    }
}
