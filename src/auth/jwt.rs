/// Access Token Codec
///
/// Signs and verifies the short-lived stateless identity tokens. The
/// signing key and TTLs are injected at construction; the codec never
/// consults process environment or global state.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::AuthError;

pub struct TokenCodec {
    settings: JwtSettings,
}

impl TokenCodec {
    pub fn new(settings: JwtSettings) -> Self {
        Self { settings }
    }

    /// Lifetime of signed access tokens, in seconds. This is the
    /// `expires_in` value callers hand to clients.
    pub fn access_token_expiry(&self) -> i64 {
        self.settings.access_token_expiry
    }

    pub fn issuer(&self) -> &str {
        &self.settings.issuer
    }

    /// Sign a claim set into a compact JWT (HS256).
    ///
    /// # Errors
    /// Returns `Internal` if signing fails
    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.settings.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("Token signing failed: {}", e)))
    }

    /// Validate a token's signature, expiry, and issuer, and return
    /// its claims.
    ///
    /// # Errors
    /// Returns `TokenExpired` for a token past its TTL, `InvalidToken`
    /// for anything else wrong with it
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.settings.issuer]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.settings.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("JWT validation error: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn get_test_codec() -> TokenCodec {
        TokenCodec::new(JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        })
    }

    fn claims_for(user_id: Uuid, email: &str) -> Claims {
        Claims::new(
            user_id,
            Some(email.to_string()),
            None,
            Utc::now(),
            3600,
            "test".to_string(),
        )
    }

    #[test]
    fn test_sign_and_verify_token() {
        let codec = get_test_codec();
        let user_id = Uuid::new_v4();

        let token = codec
            .sign(&claims_for(user_id, "test@example.com"))
            .expect("Failed to sign token");
        let claims = codec.verify(&token).expect("Failed to verify token");

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email.as_deref(), Some("test@example.com"));
        assert_eq!(claims.iss, "test");
    }

    #[test]
    fn test_invalid_token() {
        let codec = get_test_codec();
        let result = codec.verify("invalid.token.here");

        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_tampered_token() {
        let codec = get_test_codec();

        let token = codec
            .sign(&claims_for(Uuid::new_v4(), "test@example.com"))
            .expect("Failed to sign token");

        // Tamper with token
        let tampered = format!("{}X", token);
        let result = codec.verify(&tampered);

        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_issuer() {
        let codec = get_test_codec();

        let token = codec
            .sign(&claims_for(Uuid::new_v4(), "test@example.com"))
            .expect("Failed to sign token");

        let other = TokenCodec::new(JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
            issuer: "wrong-issuer".to_string(),
        });
        let result = other.verify(&token);

        assert!(result.is_err());
    }

    #[test]
    fn test_expired_token() {
        let codec = get_test_codec();
        let user_id = Uuid::new_v4();

        // Issued two hours ago with a one-hour TTL, past the decoder's
        // default leeway.
        let stale = Claims::new(
            user_id,
            None,
            None,
            Utc::now() - chrono::Duration::hours(2),
            3600,
            "test".to_string(),
        );
        let token = codec.sign(&stale).expect("Failed to sign token");

        let result = codec.verify(&token);
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }
}
