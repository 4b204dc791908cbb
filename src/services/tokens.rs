//! Issue and decode the signed session tokens (HS256 JWT).
//!
//! Expiry is checked against the injected [`Clock`] rather than by
//! `jsonwebtoken`, so a [`ManualClock`](super::clock::ManualClock) can push a
//! token past its lifetime in tests.

use anyhow::Context;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::TokenConfig;
use crate::db::User;
use crate::domain::{Role, UserId};
use crate::services::clock::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    /// No revocation list exists yet, so nothing produces this.
    #[error("Token has been revoked")]
    Revoked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: UserId,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub is_verified: bool,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub iss: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: UserId,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub iss: String,
}

trait TokenClaims {
    fn kind(&self) -> TokenKind;
    fn exp(&self) -> i64;
}

impl TokenClaims for AccessClaims {
    fn kind(&self) -> TokenKind {
        self.kind
    }

    fn exp(&self) -> i64 {
        self.exp
    }
}

impl TokenClaims for RefreshClaims {
    fn kind(&self) -> TokenKind {
        self.kind
    }

    fn exp(&self) -> i64 {
        self.exp
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_ttl: i64,
    refresh_ttl: i64,
    leeway: i64,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    #[must_use]
    pub fn new(config: &TokenConfig, clock: Arc<dyn Clock>) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: config.issuer.clone(),
            access_ttl: config.access_ttl_seconds,
            refresh_ttl: config.refresh_ttl_seconds,
            leeway: config.leeway_seconds,
            clock,
        }
    }

    /// Sign a fresh access/refresh pair for `user`.
    pub fn issue(&self, user: &User) -> anyhow::Result<TokenPair> {
        let iat = self.clock.now().timestamp();

        let access = AccessClaims {
            sub: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            role: user.role,
            is_verified: user.is_verified,
            kind: TokenKind::Access,
            iat,
            exp: iat + self.access_ttl,
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
        };

        let refresh = RefreshClaims {
            sub: user.id,
            kind: TokenKind::Refresh,
            iat,
            exp: iat + self.refresh_ttl,
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
        };

        let header = Header::new(Algorithm::HS256);
        let access_token =
            encode(&header, &access, &self.encoding_key).context("Failed to sign access token")?;
        let refresh_token = encode(&header, &refresh, &self.encoding_key)
            .context("Failed to sign refresh token")?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: self.access_ttl,
        })
    }

    /// Rotation: a refresh always yields a brand new pair.
    pub fn refresh(&self, user: &User) -> anyhow::Result<TokenPair> {
        self.issue(user)
    }

    pub fn decode_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.decode_as(token, TokenKind::Access)
    }

    pub fn decode_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.decode_as(token, TokenKind::Refresh)
    }

    fn decode_as<C>(&self, token: &str, expected: TokenKind) -> Result<C, TokenError>
    where
        C: DeserializeOwned + TokenClaims,
    {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let claims = decode::<C>(token, &self.decoding_key, &validation)
            .map_err(|_| TokenError::Invalid)?
            .claims;

        if claims.kind() != expected {
            return Err(TokenError::Invalid);
        }

        if self.clock.now().timestamp() >= claims.exp() + self.leeway {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
