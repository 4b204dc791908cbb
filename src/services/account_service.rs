//! Administrative actions on other users' accounts.

use thiserror::Error;

use crate::db::User;
use crate::domain::{Role, UserId};
use crate::services::validation::FieldErrors;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AccountError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// Who is performing an administrative action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    async fn get_user(&self, actor: Actor, user_id: UserId) -> Result<User, AccountError>;

    /// Activates or deactivates an account. Staff only; nobody can
    /// deactivate themselves.
    async fn set_active(
        &self,
        actor: Actor,
        user_id: UserId,
        active: bool,
    ) -> Result<User, AccountError>;

    /// Changes an account's role. Super admins only.
    async fn set_role(
        &self,
        actor: Actor,
        user_id: UserId,
        role: Role,
    ) -> Result<User, AccountError>;
}
