use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use sha2::{Digest, Sha256};
use std::fmt::Write;

use crate::domain::{TokenPurpose, UserId};
use crate::entities::{account_tokens, users};

pub struct AccountTokenRepository {
    conn: DatabaseConnection,
}

impl AccountTokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Store a new token hash for `user_id`, invalidating any unused token
    /// previously issued for the same purpose.
    pub async fn issue(
        &self,
        user_id: UserId,
        purpose: TokenPurpose,
        token_hash: String,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Result<()> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to start transaction")?;

        account_tokens::Entity::update_many()
            .col_expr(account_tokens::Column::UsedAt, Expr::value(now))
            .filter(account_tokens::Column::UserId.eq(user_id.value()))
            .filter(account_tokens::Column::Purpose.eq(purpose))
            .filter(account_tokens::Column::UsedAt.is_null())
            .exec(&txn)
            .await
            .context("Failed to invalidate outstanding tokens")?;

        account_tokens::ActiveModel {
            user_id: Set(user_id.value()),
            purpose: Set(purpose),
            token_hash: Set(token_hash),
            expires_at: Set(now + ttl),
            used_at: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert account token")?;

        txn.commit().await.context("Failed to commit token issue")?;

        Ok(())
    }

    /// The owning user of a token that is still redeemable at `now`, without
    /// using it up.
    pub async fn find_active(
        &self,
        purpose: TokenPurpose,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>> {
        let token = find_redeemable(&self.conn, purpose, token_hash, now).await?;
        Ok(token.map(|token| UserId::new(token.user_id)))
    }

    /// Redeem a token. Returns the owning user when the token exists, matches
    /// `purpose`, is unused and has not expired at `now`; the token is then
    /// marked used so a second call returns `None`.
    pub async fn consume(
        &self,
        purpose: TokenPurpose,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>> {
        consume_on(&self.conn, purpose, token_hash, now).await
    }

    /// Redeem a password reset token and store the new password hash in one
    /// transaction. The lockout counters are cleared as well. Nothing is
    /// written when the token cannot be redeemed.
    pub async fn redeem_password_reset(
        &self,
        token_hash: &str,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to start transaction")?;

        let Some(user_id) = consume_on(&txn, TokenPurpose::PasswordReset, token_hash, now).await?
        else {
            txn.rollback().await.context("Failed to roll back reset")?;
            return Ok(None);
        };

        let result = users::Entity::update_many()
            .col_expr(users::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(users::Column::FailedLoginAttempts, Expr::value(0))
            .col_expr(
                users::Column::LockedUntil,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(user_id.value()))
            .exec(&txn)
            .await
            .context("Failed to store reset password")?;

        if result.rows_affected == 0 {
            anyhow::bail!("User not found: {user_id}");
        }

        txn.commit().await.context("Failed to commit password reset")?;

        Ok(Some(user_id))
    }
}

async fn find_redeemable<C: ConnectionTrait>(
    conn: &C,
    purpose: TokenPurpose,
    token_hash: &str,
    now: DateTime<Utc>,
) -> Result<Option<account_tokens::Model>> {
    let token = account_tokens::Entity::find()
        .filter(account_tokens::Column::TokenHash.eq(token_hash))
        .filter(account_tokens::Column::Purpose.eq(purpose))
        .one(conn)
        .await
        .context("Failed to query account token")?;

    Ok(token.filter(|token| token.used_at.is_none() && now < token.expires_at))
}

async fn consume_on<C: ConnectionTrait>(
    conn: &C,
    purpose: TokenPurpose,
    token_hash: &str,
    now: DateTime<Utc>,
) -> Result<Option<UserId>> {
    let Some(token) = find_redeemable(conn, purpose, token_hash, now).await? else {
        return Ok(None);
    };

    // Guarded on used_at so two concurrent redemptions cannot both succeed
    let result = account_tokens::Entity::update_many()
        .col_expr(account_tokens::Column::UsedAt, Expr::value(now))
        .filter(account_tokens::Column::Id.eq(token.id))
        .filter(account_tokens::Column::UsedAt.is_null())
        .exec(conn)
        .await
        .context("Failed to mark account token used")?;

    if result.rows_affected == 0 {
        return Ok(None);
    }

    Ok(Some(UserId::new(token.user_id)))
}

/// Generate a random URL-safe token (64 character hex string)
#[must_use]
pub fn generate_account_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    to_hex(&bytes)
}

/// SHA-256 of a raw token, hex encoded. This is what gets persisted.
#[must_use]
pub fn hash_account_token(token: &str) -> String {
    to_hex(&Sha256::digest(token.as_bytes()))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut acc, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        })
}
