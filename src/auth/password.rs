//! Password hashing with Argon2id
//!
//! Hashes are stored as PHC strings, which carry their own salt and
//! parameters.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use tracing::warn;

use crate::types::PolicyError;

/// Shortest password accepted at registration
pub const MIN_PASSWORD_LEN: usize = 8;

/// Hash a password, returning the PHC-formatted string
pub fn hash_password(password: &str) -> Result<String, PolicyError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PolicyError::Internal(format!("Failed to hash password: {e}")))
}

/// Check a password against a stored hash
///
/// A stored hash that is not an Argon2 PHC string (such as a bcrypt hash
/// from older accounts) never matches.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PolicyError> {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(parsed) if parsed.algorithm.as_str().starts_with("argon2") => parsed,
        _ => {
            warn!("Stored password hash is not Argon2, treating as mismatch");
            return Ok(false);
        }
    };

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
