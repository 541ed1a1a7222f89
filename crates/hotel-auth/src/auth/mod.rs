//! Authentication module for the hotel front desk
//!
//! Verifies staff credentials and enforces the login protections.
//! ALL logins MUST go through [`Authenticator::authenticate`].
//!
//! # Security Model
//!
//! - Passwords are stored as Argon2id verifiers (memory-hard, salted)
//! - Verification is constant-time inside the argon2 crate
//! - Unknown usernames and wrong passwords produce the same error
//! - Repeated failures lock the account for a fixed window
//! - A locked account is rejected before its password is even checked
//! - Sessions expire after idle and absolute timeouts

mod authenticator;
pub(crate) mod hashing;
mod lockout;
mod password;
mod session;

pub use authenticator::Authenticator;
pub use hashing::{verify_password, CredentialHasher};
pub use lockout::{LockStatus, LockoutPolicy, LockoutTracker};
pub use password::{PasswordCheck, PasswordPolicy, PasswordRule, SPECIAL_CHARACTERS};
pub use session::{Session, SessionConfig};

use serde::Serialize;

use crate::store::StoreError;

/// A verified staff member
///
/// Issued only by a successful authentication and never persisted. It can
/// be serialized for display but never deserialized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Identity {
    user_id: i64,
    role_id: i64,
}

impl Identity {
    pub(crate) fn new(user_id: i64, role_id: i64) -> Self {
        Self { user_id, role_id }
    }

    /// Store-assigned user id
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Role id at the time of login
    pub fn role_id(&self) -> i64 {
        self.role_id
    }
}

/// Authentication error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Username and password are required")]
    InvalidInput,

    #[error("Account is temporarily locked")]
    AccountLocked {
        /// Seconds until the lock expires, when known
        remaining_secs: Option<u64>,
    },

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Authentication unavailable: {0}")]
    Unavailable(String),

    #[error("Password does not meet policy: {}", describe_rules(.0))]
    PolicyViolation(Vec<PasswordRule>),

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Account already exists: {0}")]
    AccountExists(String),

    #[error("Unknown role: {0}")]
    UnknownRole(i64),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Session expired - please log in again")]
    SessionExpired,

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

impl AuthError {
    /// Collapse any store failure into `Unavailable`
    ///
    /// Used on the login path, where store details must not leak whether
    /// an account exists.
    pub fn unavailable(e: StoreError) -> Self {
        AuthError::Unavailable(e.to_string())
    }

    /// Map store failures on administrative paths, where the caller already
    /// knows which account it is acting on
    pub fn from_admin_store(e: StoreError) -> Self {
        match e {
            StoreError::UnknownAccount(name) => AuthError::UnknownAccount(name),
            StoreError::Duplicate(name) => AuthError::AccountExists(name),
            other => AuthError::Unavailable(other.to_string()),
        }
    }

    /// Whether retrying the same input later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthError::AccountLocked { .. } | AuthError::Unavailable(_)
        )
    }
}

fn describe_rules(rules: &[PasswordRule]) -> String {
    rules
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_violation_message_joins_rules() {
        let err = AuthError::PolicyViolation(vec![
            PasswordRule::MissingDigit,
            PasswordRule::MissingSpecial,
        ]);
        let msg = err.to_string();
        assert!(msg.contains("digit"));
        assert!(msg.contains("; "));
    }

    #[test]
    fn test_login_path_hides_unknown_account() {
        let err = AuthError::unavailable(StoreError::UnknownAccount("ghost".into()));
        assert!(matches!(err, AuthError::Unavailable(_)));

        let err = AuthError::from_admin_store(StoreError::UnknownAccount("ghost".into()));
        assert_eq!(err, AuthError::UnknownAccount("ghost".into()));
    }

    #[test]
    fn test_transient_errors() {
        assert!(AuthError::AccountLocked { remaining_secs: None }.is_transient());
        assert!(AuthError::Unavailable("down".into()).is_transient());
        assert!(!AuthError::InvalidCredentials.is_transient());
    }

    #[test]
    fn test_identity_serializes_for_display() {
        let json = serde_json::to_value(Identity::new(7, 2)).unwrap();
        assert_eq!(json, serde_json::json!({ "user_id": 7, "role_id": 2 }));
    }
}
