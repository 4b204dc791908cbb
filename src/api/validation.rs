use axum::extract::FromRequest;

use super::ApiError;
use crate::domain::UserId;

/// `Json` whose rejection renders as a 400 `ValidationError` envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

pub fn validate_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.trim().parse().map_err(|_| {
        ApiError::validation(format!(
            "Invalid user ID: {raw}. ID must be a UUID"
        ))
    })
}

pub fn validate_token_param<'a>(token: &'a str, field: &str) -> Result<&'a str, ApiError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        let mut errors = crate::services::validation::FieldErrors::new();
        errors.insert(field.to_string(), "Token is required".to_string());
        return Err(ApiError::fields(errors));
    }
    Ok(trimmed)
}
