/// Bearer Secret Generation and Hashing
///
/// Both token services use this module: generate a random secret,
/// return it to the caller once, store only its SHA-256 hash, and
/// redeem later by rehashing and looking up the digest. Keeping one
/// shared helper means the refresh and reset paths cannot drift in
/// hashing or secret strength.

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

/// Secret length in alphanumeric characters. 64 characters drawn from
/// a 62-symbol alphabet carry ~380 bits of entropy, comfortably past
/// the 128-bit guessing bound.
pub const SECRET_LENGTH: usize = 64;

/// Source of raw bearer secrets. Injected into the services so tests
/// can substitute a deterministic generator.
pub trait SecretSource: Send + Sync {
    fn generate(&self) -> String;
}

/// Production source drawing from the thread-local CSPRNG.
pub struct RandomSecretSource;

impl SecretSource for RandomSecretSource {
    fn generate(&self) -> String {
        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SECRET_LENGTH)
            .map(char::from)
            .collect()
    }
}

/// Hash a bearer secret using SHA-256.
///
/// Never store plaintext secrets in the database. Lookups compare the
/// hex digest against the unique hash index, not the plaintext.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_secret() {
        let secret = RandomSecretSource.generate();

        // Secret should be 64 characters
        assert_eq!(secret.len(), SECRET_LENGTH);
        // Secret should be alphanumeric
        assert!(secret.chars().all(|c| c.is_alphanumeric()));
    }

    #[test]
    fn test_secret_hashing() {
        let secret = RandomSecretSource.generate();
        let hash1 = hash_secret(&secret);
        let hash2 = hash_secret(&secret);

        // Same secret should produce same hash
        assert_eq!(hash1, hash2);
        // Hash should not equal plaintext
        assert_ne!(secret, hash1);
        // Hash should be 64 chars (SHA-256 hex)
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_secrets_different_hashes() {
        let secret1 = RandomSecretSource.generate();
        let secret2 = RandomSecretSource.generate();

        assert_ne!(secret1, secret2, "Each secret should be unique");
        assert_ne!(hash_secret(&secret1), hash_secret(&secret2));
    }
}
