//! Password hashing and refresh-token fingerprinting.
//!
//! Passwords get the slow, salted argon2 treatment. Refresh tokens only
//! need a fast one-way digest so the raw token is never stored at rest.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use sha2::{Digest, Sha512};

/// Hash a password with argon2 and a random per-hash salt.
/// Returns the PHC-format string (algorithm, parameters, salt, and hash).
pub fn hash_password(plain: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(plain.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC-format hash.
/// Returns false for malformed hashes rather than erroring.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// Compute the SHA-512 hex digest of a token.
///
/// Used to persist refresh tokens as fingerprints: a presented token is
/// accepted only when its digest equals the stored one, which makes every
/// rotated-out refresh token permanently unusable.
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("secret1").unwrap();
        assert_ne!(hash, "secret1");
        assert!(verify_password("secret1", &hash));
    }

    #[test]
    fn test_wrong_password_rejected() {
        let hash = hash_password("secret1").unwrap();
        assert!(!verify_password("secret2", &hash));
    }

    #[test]
    fn test_salted_hashes_differ() {
        let a = hash_password("secret1").unwrap();
        let b = hash_password("secret1").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("secret1", &a));
        assert!(verify_password("secret1", &b));
    }

    #[test]
    fn test_malformed_hash_rejected() {
        assert!(!verify_password("secret1", "not-a-phc-string"));
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let a = fingerprint("some.refresh.token");
        let b = fingerprint("some.refresh.token");
        assert_eq!(a, b);
        // SHA-512 hex digest is 128 characters
        assert_eq!(a.len(), 128);
    }

    #[test]
    fn test_fingerprint_differs_per_token() {
        assert_ne!(fingerprint("token-a"), fingerprint("token-b"));
    }
}
