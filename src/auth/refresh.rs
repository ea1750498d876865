/// Refresh Token Rotation
///
/// The rotation engine behind login sessions. Refresh tokens are:
/// - Cryptographically secure random 64-character secrets
/// - Hashed with SHA-256 before storage (never store plaintext)
/// - Single-use: redemption retires the token and mints a successor
///   in the same token family
/// - Database-backed for revocation support
///
/// Redeeming an already-used secret is treated as evidence the secret
/// leaked: the whole family is revoked before the error is returned.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::auth::jwt::TokenCodec;
use crate::clock::Clock;
use crate::configuration::JwtSettings;
use crate::error::AuthError;
use crate::secret::{hash_secret, SecretSource};
use crate::store::{NewRefreshToken, RefreshTokenStore};

/// Access/refresh pair handed to clients. The `refresh_token` field is
/// the only place the raw refresh secret ever appears after minting.
#[derive(Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

pub struct RefreshService {
    store: Arc<dyn RefreshTokenStore>,
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
    secrets: Arc<dyn SecretSource>,
    refresh_token_expiry: i64,
}

impl RefreshService {
    pub fn new(
        store: Arc<dyn RefreshTokenStore>,
        settings: JwtSettings,
        clock: Arc<dyn Clock>,
        secrets: Arc<dyn SecretSource>,
    ) -> Self {
        let refresh_token_expiry = settings.refresh_token_expiry;
        Self {
            store,
            codec: TokenCodec::new(settings),
            clock,
            secrets,
            refresh_token_expiry,
        }
    }

    /// The codec signing this service's access tokens. Middleware uses
    /// it to verify bearer tokens on incoming requests.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Issue a brand-new token pair for a user, starting a new token
    /// family. Called at login and registration.
    ///
    /// # Errors
    /// Returns `Internal` if storage or signing fails
    pub async fn issue_pair(
        &self,
        user_id: Uuid,
        email: &str,
        display_name: &str,
    ) -> Result<TokenPair, AuthError> {
        let now = self.clock.now();
        let token_family = Uuid::new_v4();

        let (refresh_token, record) = self.mint_record(user_id, token_family, now);
        self.store.insert(record).await?;

        let claims = Claims::new(
            user_id,
            Some(email.to_string()),
            Some(display_name.to_string()),
            now,
            self.codec.access_token_expiry(),
            self.codec.issuer().to_string(),
        );
        let access_token = self.codec.sign(&claims)?;

        tracing::info!(user_id = %user_id, "Issued new token pair");

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.codec.access_token_expiry(),
        })
    }

    /// Redeem a refresh secret for a fresh token pair, rotating the
    /// secret: the presented token is marked used and a successor in
    /// the same family replaces it, atomically.
    ///
    /// # Errors
    /// - `InvalidToken`: unknown or empty secret
    /// - `TokenRevoked`: the token was explicitly invalidated
    /// - `TokenExpired`: past its TTL
    /// - `TokenReuse`: the secret was already redeemed once; the whole
    ///   family has been revoked by the time this returns
    /// - `Internal`: storage or signing failure
    pub async fn redeem_and_rotate(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let now = self.clock.now();
        let token_hash = hash_secret(refresh_token);

        let record = match self.store.find_by_hash(&token_hash).await? {
            Some(record) => record,
            None => {
                tracing::warn!("Refresh token not found in store");
                return Err(AuthError::InvalidToken);
            }
        };

        if record.revoked_at.is_some() {
            tracing::warn!(user_id = %record.user_id, "Attempt to use revoked refresh token");
            return Err(AuthError::TokenRevoked);
        }

        if record.expires_at <= now {
            tracing::info!(user_id = %record.user_id, "Refresh token expired");
            return Err(AuthError::TokenExpired);
        }

        if record.used_at.is_some() {
            return self.handle_reuse(record.token_family, record.user_id, now).await;
        }

        let (new_refresh_token, successor) =
            self.mint_record(record.user_id, record.token_family, now);

        let consumed = self
            .store
            .consume_and_insert(record.id, now, successor)
            .await?;

        if !consumed {
            // A concurrent request consumed this record between our
            // read and the conditional update. Re-read to classify.
            return match self.store.find_by_hash(&token_hash).await? {
                Some(current) if current.used_at.is_some() => {
                    self.handle_reuse(current.token_family, current.user_id, now)
                        .await
                }
                Some(current) if current.revoked_at.is_some() => {
                    tracing::warn!(user_id = %current.user_id, "Refresh token revoked mid-rotation");
                    Err(AuthError::TokenRevoked)
                }
                _ => Err(AuthError::Internal(
                    "refresh token state changed during rotation".to_string(),
                )),
            };
        }

        // Identity claims beyond the subject are only known at
        // issuance; rotation signs from the stored record.
        let claims = Claims::new(
            record.user_id,
            None,
            None,
            now,
            self.codec.access_token_expiry(),
            self.codec.issuer().to_string(),
        );
        let access_token = self.codec.sign(&claims)?;

        tracing::info!(user_id = %record.user_id, "Rotated refresh token");

        Ok(TokenPair {
            access_token,
            refresh_token: new_refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.codec.access_token_expiry(),
        })
    }

    /// Revoke the token matching the given secret (logout). Unknown
    /// and already-revoked secrets succeed: logout is idempotent.
    ///
    /// # Errors
    /// Returns `Internal` if storage fails
    pub async fn revoke_one(&self, refresh_token: &str) -> Result<(), AuthError> {
        if refresh_token.is_empty() {
            return Ok(());
        }

        let token_hash = hash_secret(refresh_token);
        self.store
            .revoke_by_hash(&token_hash, self.clock.now())
            .await
    }

    /// Revoke every token the user holds, across all families
    /// ("sign out everywhere").
    ///
    /// # Errors
    /// Returns `Internal` if storage fails
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.store
            .revoke_all_for_user(user_id, self.clock.now())
            .await
    }

    /// Reuse path: the cascade must complete before the error goes
    /// back, or a crash in between would leave the leaked lineage
    /// usable.
    async fn handle_reuse(
        &self,
        token_family: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        tracing::warn!(
            user_id = %user_id,
            token_family = %token_family,
            "Refresh token reuse detected, revoking token family"
        );
        self.store.revoke_family(token_family, now).await?;
        Err(AuthError::TokenReuse)
    }

    fn mint_record(
        &self,
        user_id: Uuid,
        token_family: Uuid,
        now: DateTime<Utc>,
    ) -> (String, NewRefreshToken) {
        let raw = self.secrets.generate();
        let record = NewRefreshToken {
            id: Uuid::new_v4(),
            user_id,
            token_hash: hash_secret(&raw),
            token_family,
            expires_at: now + Duration::seconds(self.refresh_token_expiry),
            created_at: now,
        };
        (raw, record)
    }
}
