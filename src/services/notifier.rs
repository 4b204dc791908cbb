//! Delivery of one-time account tokens to their owner.
//!
//! There is no mail transport yet. [`LogNotifier`] writes the token to the
//! debug log so a developer can pick it up; [`MemoryNotifier`] keeps them for
//! tests.

use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

use crate::domain::TokenPurpose;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn password_reset_requested(&self, email: &str, token: &str);

    async fn verification_requested(&self, email: &str, token: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn password_reset_requested(&self, email: &str, token: &str) {
        info!(email = %email, "Password reset token issued");
        debug!(email = %email, token = %token, "Password reset token");
    }

    async fn verification_requested(&self, email: &str, token: &str) {
        info!(email = %email, "Email verification token issued");
        debug!(email = %email, token = %token, "Email verification token");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentToken {
    pub purpose: TokenPurpose,
    pub email: String,
    pub token: String,
}

/// Records every token it is handed.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<SentToken>>,
}

impl MemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sent(&self) -> Vec<SentToken> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent token of `purpose` sent to `email`.
    #[must_use]
    pub fn last_token_for(&self, email: &str, purpose: TokenPurpose) -> Option<String> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|sent| sent.email == email && sent.purpose == purpose)
            .map(|sent| sent.token.clone())
    }

    fn record(&self, purpose: TokenPurpose, email: &str, token: &str) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentToken {
                purpose,
                email: email.to_string(),
                token: token.to_string(),
            });
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn password_reset_requested(&self, email: &str, token: &str) {
        self.record(TokenPurpose::PasswordReset, email, token);
    }

    async fn verification_requested(&self, email: &str, token: &str) {
        self.record(TokenPurpose::EmailVerification, email, token);
    }
}
