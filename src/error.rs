/// Error Handling Module
///
/// Typed failure taxonomy for the token services. Every operation
/// returns one of these variants; nothing is thrown across the crate
/// boundary as an opaque error. The embedding HTTP layer maps each
/// variant to a status code via `code()`.

use std::error::Error as StdError;
use std::fmt;

/// Failures returned by the refresh rotation engine and the password
/// reset service.
#[derive(Debug)]
pub enum AuthError {
    /// Malformed or unknown secret, or a bad signature.
    InvalidToken,
    /// The presented token is past its TTL.
    TokenExpired,
    /// The presented token was explicitly invalidated.
    TokenRevoked,
    /// An already-consumed refresh secret was presented again. The
    /// token family has been revoked by the time this is returned.
    TokenReuse,
    /// Reset-token failure, deliberately coarse: unknown, used, and
    /// expired tokens are indistinguishable to the caller.
    InvalidOrExpired,
    /// Storage or signing failure.
    Internal(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenRevoked => write!(f, "Token has been revoked"),
            AuthError::TokenReuse => write!(f, "Token reuse detected"),
            AuthError::InvalidOrExpired => write!(f, "Invalid or expired token"),
            AuthError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AuthError {}

impl AuthError {
    /// Stable machine-readable code for client-side and HTTP mapping
    /// (e.g. TOKEN_REUSE -> 403, TOKEN_EXPIRED -> 401, INTERNAL -> 500).
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidToken => "TOKEN_INVALID",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::TokenRevoked => "TOKEN_REVOKED",
            AuthError::TokenReuse => "TOKEN_REUSE",
            AuthError::InvalidOrExpired => "RESET_TOKEN_INVALID",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        let error_msg = err.to_string();

        if error_msg.contains("pool") || error_msg.contains("connect") {
            AuthError::Internal(format!("Database connection error: {}", error_msg))
        } else {
            AuthError::Internal(format!("Database error: {}", error_msg))
        }
    }
}

impl From<String> for AuthError {
    fn from(msg: String) -> Self {
        AuthError::Internal(msg)
    }
}

impl From<&str> for AuthError {
    fn from(msg: &str) -> Self {
        AuthError::Internal(msg.to_string())
    }
}
