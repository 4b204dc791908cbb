//! Domain service for authentication.
//!
//! Handles registration, login, token refresh, password reset and change,
//! and email verification.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::db::User;
use crate::domain::UserId;
use crate::services::credentials::CredentialError;
use crate::services::tokens::{TokenError, TokenPair};
use crate::services::validation::FieldErrors;

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const ACCOUNT_LOCKED: &str =
    "Account is locked due to too many failed login attempts. Please try again later.";
pub const ACCOUNT_DEACTIVATED: &str = "Account is deactivated";
pub const USER_NOT_FOUND: &str = "User not found";
pub const CURRENT_PASSWORD_INCORRECT: &str = "Current password is incorrect";
pub const PASSWORD_UNCHANGED: &str = "New password must be different from current password";
pub const INVALID_RESET_TOKEN: &str = "Invalid or expired reset token";
pub const INVALID_VERIFICATION_TOKEN: &str = "Invalid or expired verification token";

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub(crate) fn authentication(message: &str) -> Self {
        Self::Authentication(message.to_string())
    }
}

impl From<DbErr> for AuthError {
    fn from(err: DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// True when `err` carries a unique constraint violation from the database.
pub(crate) fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<DbErr>()
        .and_then(DbErr::sql_err)
        .is_some_and(|e| matches!(e, SqlErr::UniqueConstraintViolation(_)))
}

/// Registration form.
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// An authenticated user together with a freshly issued token pair.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub tokens: TokenPair,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account and signs it in.
    ///
    /// # Errors
    ///
    /// [`AuthError::Validation`] lists every invalid field at once;
    /// [`AuthError::Conflict`] when the email or username is taken.
    async fn register(&self, input: RegisterInput) -> Result<AuthSession, AuthError>;

    /// Verifies credentials, applying the lockout policy.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Authentication`] for unknown email, wrong
    /// password, locked or deactivated account.
    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// Issues a new token pair for a user whose refresh token was accepted.
    async fn refresh_tokens(&self, user_id: UserId) -> Result<TokenPair, AuthError>;

    /// Loads the active user behind a token subject.
    async fn current_user(&self, user_id: UserId) -> Result<User, AuthError>;

    /// Sends a reset token if the address belongs to an active account.
    /// Unknown addresses succeed silently.
    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError>;

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError>;

    async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    /// Redeems an email verification token.
    async fn verify_email(&self, token: &str) -> Result<User, AuthError>;

    /// Sends a new verification token. Returns false when the account is
    /// already verified and nothing was sent.
    async fn resend_verification(&self, user_id: UserId) -> Result<bool, AuthError>;
}
