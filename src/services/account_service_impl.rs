use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::db::{Store, User};
use crate::domain::{Role, UserId};
use crate::services::account_service::{AccountError, AccountService, Actor};
use crate::services::clock::Clock;
use crate::services::validation;

const INSUFFICIENT_PERMISSIONS: &str = "Insufficient permissions";

pub struct SeaOrmAccountService {
    store: Store,
    clock: Arc<dyn Clock>,
}

impl SeaOrmAccountService {
    #[must_use]
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    async fn require_user(&self, user_id: UserId) -> Result<User, AccountError> {
        self.store
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AccountError::NotFound("User not found".to_string()))
    }
}

fn require_staff(actor: Actor) -> Result<(), AccountError> {
    if actor.role.is_staff() {
        Ok(())
    } else {
        Err(AccountError::Authorization(
            INSUFFICIENT_PERMISSIONS.to_string(),
        ))
    }
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn get_user(&self, actor: Actor, user_id: UserId) -> Result<User, AccountError> {
        require_staff(actor)?;
        self.require_user(user_id).await
    }

    async fn set_active(
        &self,
        actor: Actor,
        user_id: UserId,
        active: bool,
    ) -> Result<User, AccountError> {
        require_staff(actor)?;

        if actor.id == user_id && !active {
            return Err(AccountError::Validation(validation::single(
                "is_active",
                "You cannot deactivate your own account",
            )));
        }

        let target = self.require_user(user_id).await?;

        // Only a super admin may disable another super admin
        if target.role == Role::SuperAdmin && actor.role != Role::SuperAdmin {
            return Err(AccountError::Authorization(
                INSUFFICIENT_PERMISSIONS.to_string(),
            ));
        }

        let user = self
            .store
            .users()
            .set_active(user_id, active, self.clock.now())
            .await?;

        info!(actor = %actor.id, user_id = %user_id, active, "Account status changed");
        Ok(user)
    }

    async fn set_role(
        &self,
        actor: Actor,
        user_id: UserId,
        role: Role,
    ) -> Result<User, AccountError> {
        if actor.role != Role::SuperAdmin {
            return Err(AccountError::Authorization(
                INSUFFICIENT_PERMISSIONS.to_string(),
            ));
        }

        if actor.id == user_id {
            return Err(AccountError::Validation(validation::single(
                "role",
                "You cannot change your own role",
            )));
        }

        self.require_user(user_id).await?;

        let user = self
            .store
            .users()
            .set_role(user_id, role, self.clock.now())
            .await?;

        info!(actor = %actor.id, user_id = %user_id, role = %role, "Role changed");
        Ok(user)
    }
}
