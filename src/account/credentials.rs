//! Password hashing collaborator.
//!
//! Wraps Argon2id behind a `hash`/`verify` pair so the rest of the crate
//! only ever handles opaque digests. Verification goes through the PHC
//! string parser, so digests produced with different parameters remain
//! verifiable.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Argon2id memory cost in KiB.
const MEMORY_COST_KIB: u32 = 19 * 1024;

/// Argon2id iteration count.
const ITERATIONS: u32 = 2;

/// Argon2id lane count.
const PARALLELISM: u32 = 1;

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

fn hasher() -> CredentialResult<Argon2<'static>> {
    let params = Params::new(MEMORY_COST_KIB, ITERATIONS, PARALLELISM, None)
        .map_err(|e| CredentialError::Hash(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a plaintext password into a PHC-format digest.
///
/// A fresh random salt is generated per call, so hashing the same password
/// twice yields different digests.
///
/// # Errors
///
/// Returns an error if the hashing primitive rejects its input.
pub fn hash(plaintext: &str) -> CredentialResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = hasher()?
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| CredentialError::Hash(e.to_string()))?;
    Ok(digest.to_string())
}

/// Check a plaintext password against a stored digest.
///
/// Returns `false` for a malformed digest rather than erroring; a digest
/// that cannot be parsed can never match.
#[must_use]
pub fn verify(plaintext: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let digest = hash("secret123").unwrap();
        assert_ne!(digest, "secret123");
        assert!(digest.starts_with("$argon2id$"));
        assert!(verify("secret123", &digest));
        assert!(!verify("wrong", &digest));
    }

    #[test]
    fn test_hash_is_salted() {
        let first = hash("secret123").unwrap();
        let second = hash("secret123").unwrap();
        assert_ne!(first, second);
        assert!(verify("secret123", &first));
        assert!(verify("secret123", &second));
    }

    #[test]
    fn test_verify_malformed_digest() {
        assert!(!verify("secret123", "not-a-digest"));
        assert!(!verify("secret123", ""));
    }
}
