/// tokenmill
///
/// Credential issuance and rotation: short-lived signed access tokens
/// paired with long-lived, single-use, rotating refresh tokens (reuse
/// detection, family-wide revocation), plus single-use password reset
/// tokens. The crate exposes plain services and typed errors; HTTP
/// transport and user storage belong to the embedding application.

pub mod auth;
pub mod clock;
pub mod configuration;
pub mod error;
pub mod secret;
pub mod store;
pub mod telemetry;
