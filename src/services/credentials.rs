//! Password hashing and verification (Argon2id).

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;
use tokio::task;

use crate::config::SecurityConfig;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Invalid Argon2 params: {0}")]
    InvalidParams(String),

    #[error("Failed to hash password: {0}")]
    Hashing(String),

    #[error("Password task failed: {0}")]
    Task(String),
}

/// Hashes and verifies passwords with the configured Argon2id cost.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    params: Params,
}

impl CredentialStore {
    pub fn from_config(config: &SecurityConfig) -> Result<Self, CredentialError> {
        let params = Params::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None, // output length (use default)
        )
        .map_err(|e| CredentialError::InvalidParams(e.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash with a fresh random salt; the same input never hashes the same twice.
    pub fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| CredentialError::Hashing(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Returns false for a mismatch and for a malformed stored hash.
    /// The cost parameters are read from the PHC string, not from `self`.
    #[must_use]
    pub fn verify(&self, password: &str, password_hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(password_hash) else {
            return false;
        };

        self.argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// [`Self::hash`] on the blocking pool.
    pub async fn hash_async(&self, password: String) -> Result<String, CredentialError> {
        let store = self.clone();
        task::spawn_blocking(move || store.hash(&password))
            .await
            .map_err(|e| CredentialError::Task(e.to_string()))?
    }

    /// [`Self::verify`] on the blocking pool.
    pub async fn verify_async(
        &self,
        password: String,
        password_hash: String,
    ) -> Result<bool, CredentialError> {
        let store = self.clone();
        task::spawn_blocking(move || store.verify(&password, &password_hash))
            .await
            .map_err(|e| CredentialError::Task(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_store() -> CredentialStore {
        let config = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        };
        CredentialStore::from_config(&config).unwrap()
    }

    #[test]
    fn hash_differs_from_plaintext_and_verifies() {
        let store = fast_store();
        let hash = store.hash("abc12345").unwrap();

        assert_ne!(hash, "abc12345");
        assert!(hash.starts_with("$argon2id$"));
        assert!(store.verify("abc12345", &hash));
        assert!(!store.verify("abc12346", &hash));
    }

    #[test]
    fn same_password_hashes_differently() {
        let store = fast_store();
        let a = store.hash("abc12345").unwrap();
        let b = store.hash("abc12345").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_is_a_mismatch() {
        let store = fast_store();
        assert!(!store.verify("abc12345", "not-a-hash"));
        assert!(!store.verify("abc12345", ""));
    }

    #[test]
    fn invalid_params_are_rejected() {
        let config = SecurityConfig {
            argon2_memory_cost_kib: 1,
            ..SecurityConfig::default()
        };
        assert!(matches!(
            CredentialStore::from_config(&config),
            Err(CredentialError::InvalidParams(_))
        ));
    }

    #[tokio::test]
    async fn async_wrappers_match_sync() {
        let store = fast_store();
        let hash = store.hash_async("pass1234".to_string()).await.unwrap();
        assert!(
            store
                .verify_async("pass1234".to_string(), hash.clone())
                .await
                .unwrap()
        );
        assert!(
            !store
                .verify_async("wrong123".to_string(), hash)
                .await
                .unwrap()
        );
    }
}
