//! Credential verification
//!
//! Order of checks for one login attempt:
//!
//! 1. Empty username or password: rejected without touching the store
//! 2. Locked account: rejected, password not checked, counter not bumped
//! 3. Unknown username: same error as a wrong password, after the same
//!    Argon2 work against a throwaway verifier
//! 4. Wrong password: one failure recorded (may lock the account)
//! 5. Correct password: counter reset, stale lock dropped, identity issued

use std::sync::Arc;

use tracing::{info, warn};

use super::{AuthError, CredentialHasher, Identity, LockStatus, LockoutTracker};
use crate::clock::Clock;
use crate::store::CredentialStore;

/// Hashed once at startup; unknown usernames are checked against it
const UNKNOWN_ACCOUNT_PASSWORD: &str = "hotel-desk/unknown-account";

/// Verifies usernames and passwords against the credential store
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    lockout: LockoutTracker,
    unknown_account_verifier: Arc<str>,
}

impl Authenticator {
    /// Create an authenticator sharing the tracker's store
    ///
    /// `hasher` must carry the cost parameters used for real accounts so
    /// that unknown usernames take as long as wrong passwords.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        lockout: LockoutTracker,
        hasher: &CredentialHasher,
    ) -> Result<Self, AuthError> {
        let unknown_account_verifier = hasher.hash(UNKNOWN_ACCOUNT_PASSWORD)?.into();
        Ok(Self {
            store,
            clock,
            lockout,
            unknown_account_verifier,
        })
    }

    /// Lockout tracker consulted on every attempt
    pub fn lockout(&self) -> &LockoutTracker {
        &self.lockout
    }

    /// Authenticate a staff member
    ///
    /// Blocking: performs a handful of store round-trips. Any store failure
    /// surfaces as [`AuthError::Unavailable`].
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput);
        }

        // Check if locked out
        let status = self
            .lockout
            .lock_status(username)
            .map_err(AuthError::unavailable)?;
        if let LockStatus::Locked { until } = status {
            warn!(username, %until, "Login attempt against locked account");
            return Err(AuthError::AccountLocked {
                remaining_secs: status.remaining_secs(self.clock.now()),
            });
        }

        let record = match self.store.lookup(username).map_err(AuthError::unavailable)? {
            Some(record) => record,
            None => {
                // Result discarded; only the timing matters
                self.store
                    .verify(password, &self.unknown_account_verifier)
                    .map_err(AuthError::unavailable)?;
                warn!(username, "Login attempt for unknown account");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let matches = self
            .store
            .verify(password, &record.verifier)
            .map_err(AuthError::unavailable)?;

        if !matches {
            self.lockout
                .record_failure(username)
                .map_err(AuthError::unavailable)?;
            return Err(AuthError::InvalidCredentials);
        }

        self.lockout
            .record_success(username)
            .map_err(AuthError::unavailable)?;

        info!(username, user_id = record.user_id, role_id = record.role_id, "Login succeeded");
        Ok(Identity::new(record.user_id, record.role_id))
    }
}
