/// Password Reset Tokens
///
/// Single-use, short-TTL secrets tied to a user id. Same
/// generate-hash-store-redeem discipline as refresh tokens, without
/// rotation chains: each new request supersedes every earlier unused
/// token for that user, so only the most recent link is honorable.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::AuthError;
use crate::secret::{hash_secret, SecretSource};
use crate::store::{NewResetToken, ResetTokenStore};

pub struct PasswordResetService {
    store: Arc<dyn ResetTokenStore>,
    clock: Arc<dyn Clock>,
    secrets: Arc<dyn SecretSource>,
}

impl PasswordResetService {
    pub fn new(
        store: Arc<dyn ResetTokenStore>,
        clock: Arc<dyn Clock>,
        secrets: Arc<dyn SecretSource>,
    ) -> Self {
        Self {
            store,
            clock,
            secrets,
        }
    }

    /// Issue a reset token for the user, invalidating every earlier
    /// unused one first. Returns the raw secret (the only time it
    /// exists in plaintext) and its expiry.
    ///
    /// # Errors
    /// Returns `Internal` if storage fails
    pub async fn create_token(
        &self,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        self.store.invalidate_user_tokens(user_id).await?;

        let now = self.clock.now();
        let expires_at = now + ttl;
        let raw = self.secrets.generate();

        self.store
            .create(NewResetToken {
                id: Uuid::new_v4(),
                user_id,
                token_hash: hash_secret(&raw),
                expires_at,
                created_at: now,
            })
            .await?;

        tracing::info!(user_id = %user_id, "Issued password reset token");

        Ok((raw, expires_at))
    }

    /// Redeem a reset secret, consuming it. Unknown, already-used, and
    /// expired tokens all come back as `InvalidOrExpired` so the
    /// response does not reveal which case applied.
    ///
    /// # Errors
    /// - `InvalidOrExpired`: no live token matches the secret
    /// - `Internal`: storage failure
    pub async fn validate_and_consume(&self, token: &str) -> Result<Uuid, AuthError> {
        if token.is_empty() {
            return Err(AuthError::InvalidOrExpired);
        }

        let token_hash = hash_secret(token);
        let user_id = self
            .store
            .consume_valid_by_hash(&token_hash, self.clock.now())
            .await?;

        match user_id {
            Some(user_id) => {
                tracing::info!(user_id = %user_id, "Password reset token consumed");
                Ok(user_id)
            }
            None => {
                tracing::warn!("Password reset attempted with unknown, used, or expired token");
                Err(AuthError::InvalidOrExpired)
            }
        }
    }
}
