/// Token Persistence
///
/// Record types and store traits for the two token tables. The traits
/// are the crate's persistence seam: the rotation engine and the reset
/// service only see these, so a Postgres pool, an in-memory map, or
/// anything else capable of conditional updates can back them.
///
/// Every state transition that reads then writes a record is expressed
/// as a single store call with transactional semantics; the engine
/// never issues a read, computes, and writes back in two round trips.

mod memory;
mod postgres;

pub use memory::InMemoryTokenStore;
pub use postgres::{PgRefreshTokenStore, PgResetTokenStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AuthError;

/// A stored refresh token. The raw secret is never persisted; only the
/// SHA-256 hash is kept, under a unique index.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    /// Shared by every token descended from one login through
    /// successive rotations; the unit of cascade revocation.
    pub token_family: Uuid,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    /// A record may mint a successor iff it is unused, unrevoked, and
    /// not past its expiry.
    pub fn is_consumable(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.revoked_at.is_none() && self.expires_at > now
    }
}

/// Insert payload for a refresh token row.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub token_family: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A stored password reset token.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResetTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a password reset token row.
#[derive(Debug, Clone)]
pub struct NewResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Persistence for refresh tokens.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Store a newly issued token.
    async fn insert(&self, token: NewRefreshToken) -> Result<(), AuthError>;

    /// Look up a token by its secret hash.
    async fn find_by_hash(&self, token_hash: &str)
        -> Result<Option<RefreshTokenRecord>, AuthError>;

    /// Atomically mark the record `used_at = now` and insert its
    /// successor, as one transaction. The update is conditioned on the
    /// record still being unused and unrevoked at commit time; if that
    /// condition no longer holds, nothing is written and `false` is
    /// returned so the caller can re-read and classify the race.
    async fn consume_and_insert(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        successor: NewRefreshToken,
    ) -> Result<bool, AuthError>;

    /// Revoke every non-revoked token in a family with one bulk
    /// conditional update.
    async fn revoke_family(&self, token_family: Uuid, now: DateTime<Utc>)
        -> Result<(), AuthError>;

    /// Revoke the single token matching the hash. Unknown or
    /// already-revoked hashes are not errors.
    async fn revoke_by_hash(&self, token_hash: &str, now: DateTime<Utc>)
        -> Result<(), AuthError>;

    /// Revoke every non-revoked token belonging to the user, across
    /// all families.
    async fn revoke_all_for_user(&self, user_id: Uuid, now: DateTime<Utc>)
        -> Result<(), AuthError>;
}

/// Persistence for password reset tokens.
#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    /// Mark every currently-unused token for the user as used, so only
    /// the most recently issued token is honorable.
    async fn invalidate_user_tokens(&self, user_id: Uuid) -> Result<(), AuthError>;

    /// Store a newly issued token.
    async fn create(&self, token: NewResetToken) -> Result<(), AuthError>;

    /// Atomically consume the token matching the hash, provided it is
    /// unused and unexpired. Returns the owning user id, or `None`
    /// when no such live token exists (unknown, used, and expired are
    /// indistinguishable here on purpose).
    async fn consume_valid_by_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(now: DateTime<Utc>) -> RefreshTokenRecord {
        RefreshTokenRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "hash".to_string(),
            token_family: Uuid::new_v4(),
            expires_at: now + Duration::days(7),
            used_at: None,
            revoked_at: None,
            created_at: now,
        }
    }

    #[test]
    fn test_fresh_record_is_consumable() {
        let now = Utc::now();
        assert!(record(now).is_consumable(now));
    }

    #[test]
    fn test_used_record_is_not_consumable() {
        let now = Utc::now();
        let mut rec = record(now);
        rec.used_at = Some(now);
        assert!(!rec.is_consumable(now));
    }

    #[test]
    fn test_revoked_record_is_not_consumable() {
        let now = Utc::now();
        let mut rec = record(now);
        rec.revoked_at = Some(now);
        assert!(!rec.is_consumable(now));
    }

    #[test]
    fn test_expired_record_is_not_consumable() {
        let now = Utc::now();
        let rec = record(now);
        assert!(!rec.is_consumable(now + Duration::days(8)));
    }
}
