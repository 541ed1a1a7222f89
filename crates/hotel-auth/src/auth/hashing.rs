//! Password verifiers
//!
//! Passwords are hashed with Argon2id into PHC strings. Verification reads
//! the cost parameters from the stored string, so verifiers created under
//! different settings keep working.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use tracing::warn;
use zeroize::Zeroizing;

use super::AuthError;
use crate::config::HashingConfig;

/// Produces Argon2id verifiers for new or changed passwords
#[derive(Clone, Debug)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    /// Create a hasher with the configured cost parameters
    pub fn new(config: &HashingConfig) -> Result<Self, AuthError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| AuthError::Hashing(format!("Invalid Argon2 parameters: {}", e)))?;
        Ok(Self { params })
    }

    /// Hash `password` with a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let password_bytes = Zeroizing::new(password.as_bytes().to_vec());

        let hash = argon2
            .hash_password(&password_bytes, &salt)
            .map_err(|e| AuthError::Hashing(format!("Failed to hash password: {}", e)))?
            .to_string();
        Ok(hash)
    }
}

/// Check `password` against a stored verifier
///
/// A verifier that is not a PHC string never matches; plaintext or legacy
/// formats are not compared.
pub fn verify_password(password: &str, verifier: &str) -> bool {
    let parsed = match PasswordHash::new(verifier) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored verifier is not a PHC string, rejecting: {}", e);
            return false;
        }
    };

    // Verify with constant-time comparison
    let password_bytes = Zeroizing::new(password.as_bytes().to_vec());
    Argon2::default()
        .verify_password(&password_bytes, &parsed)
        .is_ok()
}
