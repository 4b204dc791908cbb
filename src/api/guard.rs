//! Request guards for protected routes.
//!
//! Each guard is an axum middleware mounted with `from_fn_with_state`. A
//! successful guard leaves the decoded claims in the request extensions,
//! where [`CurrentClaims`] / [`CurrentRefresh`] pick them up.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::domain::Role;
use crate::services::{AccessClaims, RefreshClaims};

/// Bearer token from the `Authorization` header, if present and well formed.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(AUTHORIZATION)
        && let Ok(value) = value.to_str()
        && let Some(token) = value.strip_prefix("Bearer ")
    {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AccessClaims, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::Unauthorized)?;
    Ok(state.tokens().decode_access(token)?)
}

/// Claims already placed by an earlier guard, otherwise decode the header.
fn claims_for(state: &AppState, request: &Request) -> Result<AccessClaims, ApiError> {
    if let Some(claims) = request.extensions().get::<AccessClaims>() {
        return Ok(claims.clone());
    }
    authenticate(state, request.headers())
}

/// Requires a valid access token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = authenticate(&state, request.headers())?;

    tracing::Span::current().record("user_id", tracing::field::display(&claims.sub));
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Requires a valid refresh token.
pub async fn require_refresh(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(ApiError::Unauthorized)?;
    let claims = state.tokens().decode_refresh(token)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// State for [`require_role`]: the app plus the roles let through.
#[derive(Clone)]
pub struct RoleGate {
    state: Arc<AppState>,
    allowed: &'static [Role],
}

impl RoleGate {
    #[must_use]
    pub const fn new(state: Arc<AppState>, allowed: &'static [Role]) -> Self {
        Self { state, allowed }
    }
}

/// Requires an access token whose role is one of the gate's roles.
pub async fn require_role(
    State(gate): State<RoleGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = claims_for(&gate.state, &request)?;

    if !gate.allowed.contains(&claims.role) {
        tracing::info!(user_id = %claims.sub, role = %claims.role, "Role not permitted");
        return Err(ApiError::forbidden("Insufficient permissions"));
    }

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Requires an access token belonging to a verified account.
pub async fn require_verified(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = claims_for(&state, &request)?;

    if !claims.is_verified {
        return Err(ApiError::EmailNotVerified(
            "Email verification required".to_string(),
        ));
    }

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Access claims left by a guard.
#[derive(Debug, Clone)]
pub struct CurrentClaims(pub AccessClaims);

impl<S> FromRequestParts<S> for CurrentClaims
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessClaims>()
            .cloned()
            .map(Self)
            .ok_or(ApiError::Unauthorized)
    }
}

/// Refresh claims left by [`require_refresh`].
#[derive(Debug, Clone)]
pub struct CurrentRefresh(pub RefreshClaims);

impl<S> FromRequestParts<S> for CurrentRefresh
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RefreshClaims>()
            .cloned()
            .map(Self)
            .ok_or(ApiError::Unauthorized)
    }
}
