//! Account administration endpoints (staff only).

use axum::extract::{Path, State};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::validate_user_id;
use super::{ApiError, ApiJson, ApiResponse, AppState, CurrentClaims, UserEnvelope};
use crate::domain::Role;
use crate::services::{AccessClaims, Actor};

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

const fn actor(claims: &AccessClaims) -> Actor {
    Actor {
        id: claims.sub,
        role: claims.role,
    }
}

/// GET /admin/users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    CurrentClaims(claims): CurrentClaims,
    Path(id): Path<String>,
) -> Result<ApiResponse<UserEnvelope>, ApiError> {
    let user_id = validate_user_id(&id)?;
    let user = state.accounts().get_user(actor(&claims), user_id).await?;
    Ok(ApiResponse::success(user.into()))
}

/// PATCH /admin/users/{id}/status
pub async fn set_status(
    State(state): State<Arc<AppState>>,
    CurrentClaims(claims): CurrentClaims,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<StatusRequest>,
) -> Result<ApiResponse<UserEnvelope>, ApiError> {
    let user_id = validate_user_id(&id)?;
    let user = state
        .accounts()
        .set_active(actor(&claims), user_id, payload.is_active)
        .await?;

    let message = if user.is_active {
        "Account activated"
    } else {
        "Account deactivated"
    };
    Ok(ApiResponse::with_message(message, user.into()))
}

/// PATCH /admin/users/{id}/role
pub async fn set_role(
    State(state): State<Arc<AppState>>,
    CurrentClaims(claims): CurrentClaims,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<RoleRequest>,
) -> Result<ApiResponse<UserEnvelope>, ApiError> {
    let user_id = validate_user_id(&id)?;
    let user = state
        .accounts()
        .set_role(actor(&claims), user_id, payload.role)
        .await?;

    Ok(ApiResponse::with_message("Role updated", user.into()))
}
