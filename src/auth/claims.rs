/// JWT Claims structure
///
/// Payload of a signed access token (RFC 7519 registered claims plus
/// optional identity fields). Access tokens are stateless: validity is
/// a matter of signature and expiry, never of a lookup.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

/// Claims carried by an access token. `sub` and `exp` are required;
/// the identity fields are present only when the issuer supplied them.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// User email, if known at signing time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// User display name, if known at signing time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        email: Option<String>,
        name: Option<String>,
        issued_at: chrono::DateTime<chrono::Utc>,
        expiry_seconds: i64,
        issuer: String,
    ) -> Self {
        let iat = issued_at.timestamp();
        Self {
            sub: user_id.to_string(),
            exp: iat + expiry_seconds,
            iat,
            iss: issuer,
            email,
            name,
        }
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// Returns error if the subject is not a valid UUID
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidToken)
    }

    /// Check if token has expired
    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.exp < now.timestamp()
    }
}
