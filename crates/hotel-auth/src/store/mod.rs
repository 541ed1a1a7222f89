//! Credential storage
//!
//! The authentication core never talks to a database directly. It is handed
//! a [`CredentialStore`] and relies on each operation being atomic for the
//! username it touches; the failed-attempt counter in particular must be
//! incremented by the store, never read-modified-written by the caller.

mod file;
mod memory;
mod table;

pub use file::JsonFileCredentialStore;
pub use memory::MemoryCredentialStore;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::hashing;

/// Stored credentials for one staff account
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Store-assigned user id
    pub user_id: i64,
    /// Unique login name
    pub username: String,
    /// Argon2id PHC string
    pub verifier: String,
    /// Consecutive failed logins since the last success or unlock
    pub failed_attempts: u32,
    /// Account is unauthenticatable while this lies in the future
    pub locked_until: Option<DateTime<Utc>>,
    /// Role id from the role configuration
    pub role_id: i64,
}

impl CredentialRecord {
    /// Whether the lock window is still open at `now`
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("verifier", &"<redacted>")
            .field("failed_attempts", &self.failed_attempts)
            .field("locked_until", &self.locked_until)
            .field("role_id", &self.role_id)
            .finish()
    }
}

/// Fields needed to create an account; the store assigns the id
#[derive(Clone)]
pub struct NewCredential {
    /// Login name
    pub username: String,
    /// Argon2id PHC string
    pub verifier: String,
    /// Role id
    pub role_id: i64,
}

/// Credential store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing store unreachable or unusable
    #[error("Credential store unavailable: {0}")]
    Unavailable(String),

    /// No account with this username
    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    /// Username already taken
    #[error("Account already exists: {0}")]
    Duplicate(String),

    /// Stored data could not be decoded
    #[error("Credential data corrupt: {0}")]
    Corrupt(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Access to credential records, keyed by username
///
/// Every mutating operation must be atomic with respect to concurrent calls
/// for the same username, including calls from other processes sharing the
/// store.
pub trait CredentialStore: Send + Sync {
    /// Fetch the record for `username`
    fn lookup(&self, username: &str) -> Result<Option<CredentialRecord>, StoreError>;

    /// Atomically add one failed attempt and return the new count
    fn increment_failed_attempts(&self, username: &str) -> Result<u32, StoreError>;

    /// Set the lock window end
    fn set_lock(&self, username: &str, until: DateTime<Utc>) -> Result<(), StoreError>;

    /// Clear any lock and zero the failed-attempt counter
    fn clear_lock_and_reset(&self, username: &str) -> Result<(), StoreError>;

    /// Zero the counter after a successful login and drop a lock that has
    /// already expired at `now`. A lock still in force is left in place.
    fn reset_after_success(&self, username: &str, now: DateTime<Utc>) -> Result<(), StoreError>;

    /// One-way comparison of `password` against a stored verifier
    fn verify(&self, password: &str, verifier: &str) -> Result<bool, StoreError> {
        Ok(hashing::verify_password(password, verifier))
    }

    /// Create an account
    fn insert(&self, new: NewCredential) -> Result<CredentialRecord, StoreError>;

    /// Replace the verifier
    fn set_verifier(&self, username: &str, verifier: &str) -> Result<(), StoreError>;

    /// Change the role
    fn set_role(&self, username: &str, role_id: i64) -> Result<(), StoreError>;

    /// All accounts ordered by user id
    fn list(&self) -> Result<Vec<CredentialRecord>, StoreError>;
}
