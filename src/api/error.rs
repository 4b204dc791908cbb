use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::services::validation::FieldErrors;
use crate::services::{AccountError, AuthError, TokenError};

#[derive(Debug)]
pub enum ApiError {
    ValidationError {
        message: String,
        errors: Option<FieldErrors>,
    },

    AuthenticationError(String),

    AuthorizationError(String),

    Forbidden(String),

    EmailNotVerified(String),

    NotFoundError(String),

    ConflictError(String),

    RateLimitError(String),

    DatabaseError(String),

    ExternalServiceError { service: String, message: String },

    ServerError(String),

    TokenExpired,

    InvalidToken,

    TokenRevoked,

    Unauthorized,
}

impl ApiError {
    /// Name rendered in the `error` field of the envelope.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ValidationError { .. } => "ValidationError",
            Self::AuthenticationError(_) => "AuthenticationError",
            Self::AuthorizationError(_) => "AuthorizationError",
            Self::Forbidden(_) => "Forbidden",
            Self::EmailNotVerified(_) => "EmailNotVerified",
            Self::NotFoundError(_) => "NotFoundError",
            Self::ConflictError(_) => "ConflictError",
            Self::RateLimitError(_) => "RateLimitError",
            Self::DatabaseError(_) => "DatabaseError",
            Self::ExternalServiceError { .. } => "ExternalServiceError",
            Self::ServerError(_) => "ServerError",
            Self::TokenExpired => "TokenExpired",
            Self::InvalidToken => "InvalidToken",
            Self::TokenRevoked => "TokenRevoked",
            Self::Unauthorized => "Unauthorized",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::ValidationError { .. } => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_)
            | Self::TokenExpired
            | Self::InvalidToken
            | Self::TokenRevoked
            | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::AuthorizationError(_) | Self::Forbidden(_) | Self::EmailNotVerified(_) => {
                StatusCode::FORBIDDEN
            }
            Self::NotFoundError(_) => StatusCode::NOT_FOUND,
            Self::ConflictError(_) => StatusCode::CONFLICT,
            Self::RateLimitError(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::DatabaseError(_) | Self::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ExternalServiceError { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationError { message, .. } => write!(f, "Validation error: {message}"),
            Self::AuthenticationError(msg) => write!(f, "Authentication error: {msg}"),
            Self::AuthorizationError(msg) => write!(f, "Authorization error: {msg}"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            Self::EmailNotVerified(msg) => write!(f, "Email not verified: {msg}"),
            Self::NotFoundError(msg) => write!(f, "Not found: {msg}"),
            Self::ConflictError(msg) => write!(f, "Conflict: {msg}"),
            Self::RateLimitError(msg) => write!(f, "Rate limited: {msg}"),
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::ExternalServiceError { service, message } => {
                write!(f, "{service} error: {message}")
            }
            Self::ServerError(msg) => write!(f, "Internal error: {msg}"),
            Self::TokenExpired => f.write_str("Token has expired"),
            Self::InvalidToken => f.write_str("Invalid token"),
            Self::TokenRevoked => f.write_str("Token has been revoked"),
            Self::Unauthorized => f.write_str("Missing authorization token"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        let (message, errors) = match self {
            Self::ValidationError { message, errors } => (message, errors),
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                ("A database error occurred".to_string(), None)
            }
            Self::ServerError(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("An internal error occurred".to_string(), None)
            }
            Self::ExternalServiceError { service, message } => {
                tracing::warn!("{} error: {}", service, message);
                (format!("{service} service is unavailable"), None)
            }
            Self::AuthenticationError(msg)
            | Self::AuthorizationError(msg)
            | Self::Forbidden(msg)
            | Self::EmailNotVerified(msg)
            | Self::NotFoundError(msg)
            | Self::ConflictError(msg)
            | Self::RateLimitError(msg) => (msg, None),
            token @ (Self::TokenExpired
            | Self::InvalidToken
            | Self::TokenRevoked
            | Self::Unauthorized) => (token.to_string(), None),
        };

        ApiResponse::<()>::error(kind, message, errors, status).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::ServerError(format!("{err:#}"))
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::TokenExpired,
            TokenError::Invalid => Self::InvalidToken,
            TokenError::Revoked => Self::TokenRevoked,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(errors) => Self::fields(errors),
            AuthError::Authentication(msg) => Self::AuthenticationError(msg),
            AuthError::Conflict(msg) => Self::ConflictError(msg),
            AuthError::Token(err) => err.into(),
            AuthError::Credential(err) => Self::ServerError(err.to_string()),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::ServerError(msg),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(errors) => Self::fields(errors),
            AccountError::Authorization(msg) => Self::AuthorizationError(msg),
            AccountError::NotFound(msg) => Self::NotFoundError(msg),
            AccountError::Database(msg) => Self::DatabaseError(msg),
            AccountError::Internal(msg) => Self::ServerError(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError {
            message: msg.into(),
            errors: None,
        }
    }

    /// Field-level failures. A single failure doubles as the message.
    #[must_use]
    pub fn fields(errors: FieldErrors) -> Self {
        let message = if errors.len() == 1 {
            errors
                .values()
                .next()
                .cloned()
                .unwrap_or_else(|| "Validation failed".to_string())
        } else {
            "Validation failed".to_string()
        };

        Self::ValidationError {
            message,
            errors: Some(errors),
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
}
