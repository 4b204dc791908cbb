use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::validate_token_param;
use super::{
    ApiError, ApiJson, ApiResponse, AppState, CurrentClaims, CurrentRefresh, SessionDto,
    TokensDto, UserEnvelope,
};
use crate::services::validation::{FieldErrors, check_password, collect};
use crate::services::{AuthError, RegisterInput};

// ============================================================================
// Request Types
// ============================================================================

// Missing fields deserialize as empty so they reach field validation.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyEmailRequest {
    pub token: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<ApiResponse<SessionDto>, ApiError> {
    let session = state
        .auth()
        .register(RegisterInput {
            email: payload.email,
            username: payload.username,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
        })
        .await?;

    Ok(ApiResponse::with_message(
        "Registration successful. Welcome to TradeSense!",
        SessionDto::new(session.user, session.tokens),
    )
    .with_status(StatusCode::CREATED))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<ApiResponse<SessionDto>, ApiError> {
    let mut errors = FieldErrors::new();
    if payload.email.trim().is_empty() {
        errors.insert("email".to_string(), "Email is required".to_string());
    }
    if payload.password.is_empty() {
        errors.insert("password".to_string(), "Password is required".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::fields(errors));
    }

    let session = state.auth().login(&payload.email, &payload.password).await?;

    Ok(ApiResponse::with_message(
        "Login successful",
        SessionDto::new(session.user, session.tokens),
    ))
}

/// POST /auth/logout
/// Tokens are stateless; the client discards them.
pub async fn logout(CurrentClaims(claims): CurrentClaims) -> ApiResponse<()> {
    tracing::info!(user_id = %claims.sub, "User logged out");
    ApiResponse::message("Logout successful")
}

/// POST /auth/refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    CurrentRefresh(claims): CurrentRefresh,
) -> Result<ApiResponse<TokensDto>, ApiError> {
    let tokens = state.auth().refresh_tokens(claims.sub).await?;

    Ok(ApiResponse::with_message(
        "Token refreshed successfully",
        tokens.into(),
    ))
}

/// GET /auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    CurrentClaims(claims): CurrentClaims,
) -> Result<ApiResponse<UserEnvelope>, ApiError> {
    let user = state.auth().current_user(claims.sub).await?;
    Ok(ApiResponse::success(user.into()))
}

/// POST /auth/forgot-password
/// Answers the same way whether or not the address is registered.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ForgotPasswordRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    match state.auth().request_password_reset(&payload.email).await {
        Ok(()) => {}
        Err(AuthError::Validation(errors)) => return Err(ApiError::fields(errors)),
        Err(err) => tracing::warn!("Password reset request failed: {err}"),
    }

    Ok(ApiResponse::message(
        "If this email exists, a password reset link will be sent",
    ))
}

/// POST /auth/reset-password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    let mut errors = FieldErrors::new();
    if payload.token.trim().is_empty() {
        errors.insert("token".to_string(), "Token is required".to_string());
    }
    collect(&mut errors, "password", check_password(&payload.password));
    if !errors.is_empty() {
        return Err(ApiError::fields(errors));
    }

    state
        .auth()
        .reset_password(&payload.token, &payload.password)
        .await?;

    Ok(ApiResponse::message(
        "Password reset successful. You can now login with your new password.",
    ))
}

/// POST /auth/change-password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    CurrentClaims(claims): CurrentClaims,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    if payload.current_password.is_empty() {
        let mut errors = FieldErrors::new();
        errors.insert(
            "current_password".to_string(),
            "Current password is required".to_string(),
        );
        return Err(ApiError::fields(errors));
    }

    state
        .auth()
        .change_password(claims.sub, &payload.current_password, &payload.new_password)
        .await?;

    Ok(ApiResponse::message("Password changed successfully"))
}

/// POST /auth/verify-email
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<VerifyEmailRequest>,
) -> Result<ApiResponse<UserEnvelope>, ApiError> {
    let token = validate_token_param(&payload.token, "token")?;
    let user = state.auth().verify_email(token).await?;

    Ok(ApiResponse::with_message(
        "Email verified successfully",
        user.into(),
    ))
}

/// POST /auth/resend-verification
pub async fn resend_verification(
    State(state): State<Arc<AppState>>,
    CurrentClaims(claims): CurrentClaims,
) -> Result<ApiResponse<()>, ApiError> {
    let sent = state.auth().resend_verification(claims.sub).await?;

    let message = if sent {
        "Verification email sent"
    } else {
        "Email is already verified"
    };
    Ok(ApiResponse::message(message))
}
