/// In-memory Token Store
///
/// Mutex-guarded implementation of both store traits with the same
/// atomicity guarantees as the Postgres stores: every read-check-write
/// sequence happens under a single lock hold. Backs the test suites
/// and is usable for prototyping without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AuthError;
use crate::store::{
    NewRefreshToken, NewResetToken, RefreshTokenRecord, RefreshTokenStore, ResetTokenRecord,
    ResetTokenStore,
};

#[derive(Default)]
pub struct InMemoryTokenStore {
    refresh: Mutex<HashMap<Uuid, RefreshTokenRecord>>,
    reset: Mutex<HashMap<Uuid, ResetTokenRecord>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryTokenStore {
    async fn insert(&self, token: NewRefreshToken) -> Result<(), AuthError> {
        let mut refresh = self.refresh.lock().unwrap();
        refresh.insert(
            token.id,
            RefreshTokenRecord {
                id: token.id,
                user_id: token.user_id,
                token_hash: token.token_hash,
                token_family: token.token_family,
                expires_at: token.expires_at,
                used_at: None,
                revoked_at: None,
                created_at: token.created_at,
            },
        );
        Ok(())
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        let refresh = self.refresh.lock().unwrap();
        Ok(refresh
            .values()
            .find(|r| r.token_hash == token_hash)
            .cloned())
    }

    async fn consume_and_insert(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        successor: NewRefreshToken,
    ) -> Result<bool, AuthError> {
        let mut refresh = self.refresh.lock().unwrap();

        // Condition check and both writes happen under one lock hold,
        // matching the Postgres transaction.
        match refresh.get_mut(&id) {
            Some(rec) if rec.used_at.is_none() && rec.revoked_at.is_none() => {
                rec.used_at = Some(now);
            }
            _ => return Ok(false),
        }

        refresh.insert(
            successor.id,
            RefreshTokenRecord {
                id: successor.id,
                user_id: successor.user_id,
                token_hash: successor.token_hash,
                token_family: successor.token_family,
                expires_at: successor.expires_at,
                used_at: None,
                revoked_at: None,
                created_at: successor.created_at,
            },
        );
        Ok(true)
    }

    async fn revoke_family(
        &self,
        token_family: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut refresh = self.refresh.lock().unwrap();
        for rec in refresh.values_mut() {
            if rec.token_family == token_family && rec.revoked_at.is_none() {
                rec.revoked_at = Some(now);
            }
        }
        Ok(())
    }

    async fn revoke_by_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut refresh = self.refresh.lock().unwrap();
        for rec in refresh.values_mut() {
            if rec.token_hash == token_hash && rec.revoked_at.is_none() {
                rec.revoked_at = Some(now);
            }
        }
        Ok(())
    }

    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut refresh = self.refresh.lock().unwrap();
        for rec in refresh.values_mut() {
            if rec.user_id == user_id && rec.revoked_at.is_none() {
                rec.revoked_at = Some(now);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ResetTokenStore for InMemoryTokenStore {
    async fn invalidate_user_tokens(&self, user_id: Uuid) -> Result<(), AuthError> {
        let mut reset = self.reset.lock().unwrap();
        for rec in reset.values_mut() {
            if rec.user_id == user_id && !rec.used {
                rec.used = true;
            }
        }
        Ok(())
    }

    async fn create(&self, token: NewResetToken) -> Result<(), AuthError> {
        let mut reset = self.reset.lock().unwrap();
        reset.insert(
            token.id,
            ResetTokenRecord {
                id: token.id,
                user_id: token.user_id,
                token_hash: token.token_hash,
                expires_at: token.expires_at,
                used: false,
                created_at: token.created_at,
            },
        );
        Ok(())
    }

    async fn consume_valid_by_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>, AuthError> {
        let mut reset = self.reset.lock().unwrap();
        for rec in reset.values_mut() {
            if rec.token_hash == token_hash && !rec.used && rec.expires_at > now {
                rec.used = true;
                return Ok(Some(rec.user_id));
            }
        }
        Ok(None)
    }
}
