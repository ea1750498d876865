/// Postgres-backed Token Stores
///
/// sqlx implementations of the store traits. Consuming a refresh token
/// and inserting its successor run inside one transaction guarded by
/// an affected-row check on the conditional UPDATE, which is what
/// closes the double-redemption window. Family and user revocation are
/// single bulk conditional updates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AuthError;
use crate::store::{
    NewRefreshToken, NewResetToken, RefreshTokenRecord, RefreshTokenStore, ResetTokenStore,
};

pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn insert(&self, token: NewRefreshToken) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens
                (id, user_id, token_hash, token_family, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.token_family)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, user_id, token_hash, token_family,
                   expires_at, used_at, revoked_at, created_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn consume_and_insert(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        successor: NewRefreshToken,
    ) -> Result<bool, AuthError> {
        let mut tx = self.pool.begin().await?;

        // The WHERE clause is the optimistic guard: if a concurrent
        // request consumed the row first, zero rows match and nothing
        // in this transaction is written.
        let updated = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET used_at = $1
            WHERE id = $2 AND used_at IS NULL AND revoked_at IS NULL
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&mut tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens
                (id, user_id, token_hash, token_family, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(successor.id)
        .bind(successor.user_id)
        .bind(&successor.token_hash)
        .bind(successor.token_family)
        .bind(successor.expires_at)
        .bind(successor.created_at)
        .execute(&mut tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn revoke_family(
        &self,
        token_family: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $1
            WHERE token_family = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(now)
        .bind(token_family)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            token_family = %token_family,
            revoked = result.rows_affected(),
            "Revoked refresh token family"
        );
        Ok(())
    }

    async fn revoke_by_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $1
            WHERE token_hash = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(now)
        .bind(token_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $1
            WHERE user_id = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(now)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        tracing::info!(user_id = %user_id, "All refresh tokens revoked for user");
        Ok(())
    }
}

pub struct PgResetTokenStore {
    pool: PgPool,
}

impl PgResetTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResetTokenStore for PgResetTokenStore {
    async fn invalidate_user_tokens(&self, user_id: Uuid) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            UPDATE password_reset_tokens
            SET used = TRUE
            WHERE user_id = $1 AND used = FALSE
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create(&self, token: NewResetToken) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens
                (id, user_id, token_hash, expires_at, used, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn consume_valid_by_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>, AuthError> {
        // Lookup and consumption are one conditional statement, so two
        // concurrent redemptions cannot both observe the token unused.
        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE password_reset_tokens
            SET used = TRUE
            WHERE token_hash = $1 AND used = FALSE AND expires_at > $2
            RETURNING user_id
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user_id)
    }
}
