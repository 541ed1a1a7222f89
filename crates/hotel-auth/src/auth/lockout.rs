//! Failed-login lockout
//!
//! An account moves from Active to Locked when its failed-attempt count
//! reaches `max_attempts`. The lock is a timestamp in the credential store;
//! nothing clears it in the background. Once the window has passed the
//! account simply reads as unlocked, and the next successful login drops
//! the stale timestamp.
//!
//! Only a successful login or an explicit unlock resets the counter, so a
//! wrong password right after a lock expires locks the account again.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::LockoutPolicyConfig;
use crate::store::{CredentialStore, StoreError};

/// Lockout thresholds
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Failures that trigger a lock
    pub max_attempts: u32,
    /// How long a triggered lock lasts
    pub lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::from(&LockoutPolicyConfig::default())
    }
}

impl From<&LockoutPolicyConfig> for LockoutPolicy {
    fn from(config: &LockoutPolicyConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            lock_duration: config.lock_duration(),
        }
    }
}

impl LockoutPolicy {
    /// Check if this many failures should lock the account
    pub fn should_lock(&self, failed_attempts: u32) -> bool {
        failed_attempts >= self.max_attempts
    }

    /// Failures left before the account locks
    pub fn attempts_remaining(&self, failed_attempts: u32) -> u32 {
        self.max_attempts.saturating_sub(failed_attempts)
    }

    /// Get a human-readable description of a remaining lock time
    pub fn describe_remaining(remaining_secs: u64) -> String {
        if remaining_secs < 60 {
            format!("Locked for {} seconds", remaining_secs)
        } else if remaining_secs < 3600 {
            format!("Locked for {} minutes", remaining_secs.div_ceil(60))
        } else if remaining_secs < 86400 {
            format!("Locked for {} hours", remaining_secs.div_ceil(3600))
        } else {
            format!("Locked for {} days", remaining_secs.div_ceil(86400))
        }
    }
}

/// Lock state of one account at a point in time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockStatus {
    /// Account may authenticate
    Active,
    /// Account is locked until the given time
    Locked { until: DateTime<Utc> },
}

impl LockStatus {
    /// Whether the account is locked
    pub fn is_locked(&self) -> bool {
        matches!(self, LockStatus::Locked { .. })
    }

    /// Whole seconds left in the lock window, rounded up
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> Option<u64> {
        match self {
            LockStatus::Active => None,
            LockStatus::Locked { until } => {
                let millis = (*until - now).num_milliseconds().max(0) as u64;
                Some(millis.div_ceil(1000))
            }
        }
    }
}

/// Tracks failed logins per username and applies the lockout policy
#[derive(Clone)]
pub struct LockoutTracker {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    policy: LockoutPolicy,
}

impl LockoutTracker {
    /// Create a tracker over the given store
    pub fn new(
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        policy: LockoutPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// Active policy
    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Record one failed login, locking the account when the threshold is reached
    ///
    /// The counter is incremented by the store and is left as is when the
    /// lock is applied.
    pub fn record_failure(&self, username: &str) -> Result<LockStatus, StoreError> {
        let failed_attempts = self.store.increment_failed_attempts(username)?;

        if !self.policy.should_lock(failed_attempts) {
            warn!(
                username,
                failed_attempts,
                remaining = self.policy.attempts_remaining(failed_attempts),
                "Failed login attempt"
            );
            return Ok(LockStatus::Active);
        }

        let until = self.clock.now() + self.policy.lock_duration;
        self.store.set_lock(username, until)?;
        warn!(username, failed_attempts, %until, "Account locked after repeated failures");
        Ok(LockStatus::Locked { until })
    }

    /// Reset the counter after a successful login, dropping an expired lock
    pub fn record_success(&self, username: &str) -> Result<(), StoreError> {
        self.store.reset_after_success(username, self.clock.now())
    }

    /// Current lock state; unknown usernames read as Active
    pub fn lock_status(&self, username: &str) -> Result<LockStatus, StoreError> {
        let now = self.clock.now();
        let status = match self.store.lookup(username)? {
            Some(record) if record.is_locked_at(now) => match record.locked_until {
                Some(until) => LockStatus::Locked { until },
                None => LockStatus::Active,
            },
            _ => LockStatus::Active,
        };
        Ok(status)
    }

    /// True iff a lock timestamp exists and lies strictly in the future
    pub fn is_locked(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.lock_status(username)?.is_locked())
    }

    /// Clear the lock and counter (administrative action)
    pub fn manual_unlock(&self, username: &str) -> Result<(), StoreError> {
        self.store.clear_lock_and_reset(username)?;
        info!(username, "Account unlocked");
        Ok(())
    }

    /// Lock the account for `duration` from now regardless of its counter
    pub fn lock_for(
        &self,
        username: &str,
        duration: Duration,
    ) -> Result<DateTime<Utc>, StoreError> {
        let until = self.clock.now() + duration;
        self.store.set_lock(username, until)?;
        warn!(username, %until, "Account locked by administrator");
        Ok(until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{MemoryCredentialStore, NewCredential};

    fn setup(max_attempts: u32) -> (Arc<MemoryCredentialStore>, Arc<ManualClock>, LockoutTracker) {
        let store = Arc::new(MemoryCredentialStore::new());
        store
            .insert(NewCredential {
                username: "alice".into(),
                verifier: "v".into(),
                role_id: 2,
            })
            .unwrap();
        let clock = Arc::new(ManualClock::default());
        let tracker = LockoutTracker::new(
            store.clone(),
            clock.clone(),
            LockoutPolicy {
                max_attempts,
                lock_duration: Duration::minutes(30),
            },
        );
        (store, clock, tracker)
    }

    #[test]
    fn test_policy_thresholds() {
        let policy = LockoutPolicy::default();
        assert!(!policy.should_lock(2));
        assert!(policy.should_lock(3));
        assert!(policy.should_lock(10));
        assert_eq!(policy.attempts_remaining(1), 2);
        assert_eq!(policy.attempts_remaining(5), 0);
    }

    #[test]
    fn test_describe_remaining() {
        assert_eq!(LockoutPolicy::describe_remaining(45), "Locked for 45 seconds");
        assert_eq!(LockoutPolicy::describe_remaining(1800), "Locked for 30 minutes");
        assert_eq!(LockoutPolicy::describe_remaining(1801), "Locked for 31 minutes");
        assert_eq!(LockoutPolicy::describe_remaining(7200), "Locked for 2 hours");
        assert_eq!(LockoutPolicy::describe_remaining(30 * 86400), "Locked for 30 days");
    }

    #[test]
    fn test_locks_at_threshold() {
        let (store, clock, tracker) = setup(3);

        assert_eq!(tracker.record_failure("alice").unwrap(), LockStatus::Active);
        assert_eq!(tracker.record_failure("alice").unwrap(), LockStatus::Active);
        let status = tracker.record_failure("alice").unwrap();

        let until = clock.now() + Duration::minutes(30);
        assert_eq!(status, LockStatus::Locked { until });
        assert!(tracker.is_locked("alice").unwrap());

        // Counter is not reset by the lock
        assert_eq!(store.lookup("alice").unwrap().unwrap().failed_attempts, 3);
    }

    #[test]
    fn test_lock_expires_lazily() {
        let (store, clock, tracker) = setup(1);
        tracker.record_failure("alice").unwrap();
        assert!(tracker.is_locked("alice").unwrap());

        clock.advance(Duration::minutes(30));
        assert!(!tracker.is_locked("alice").unwrap());
        // Timestamp still stored until the next success
        assert!(store.lookup("alice").unwrap().unwrap().locked_until.is_some());

        tracker.record_success("alice").unwrap();
        let record = store.lookup("alice").unwrap().unwrap();
        assert!(record.locked_until.is_none());
        assert_eq!(record.failed_attempts, 0);
    }

    #[test]
    fn test_success_does_not_lift_active_lock() {
        let (_store, _clock, tracker) = setup(1);
        tracker.record_failure("alice").unwrap();
        tracker.record_success("alice").unwrap();
        assert!(tracker.is_locked("alice").unwrap());
    }

    #[test]
    fn test_manual_unlock() {
        let (store, _clock, tracker) = setup(2);
        tracker.record_failure("alice").unwrap();
        tracker.record_failure("alice").unwrap();
        assert!(tracker.is_locked("alice").unwrap());

        tracker.manual_unlock("alice").unwrap();
        assert!(!tracker.is_locked("alice").unwrap());
        assert_eq!(store.lookup("alice").unwrap().unwrap().failed_attempts, 0);
    }

    #[test]
    fn test_unknown_username_is_active() {
        let (_store, _clock, tracker) = setup(3);
        assert_eq!(tracker.lock_status("ghost").unwrap(), LockStatus::Active);
    }

    #[test]
    fn test_remaining_secs_rounds_up() {
        let now = Utc::now();
        let status = LockStatus::Locked {
            until: now + Duration::milliseconds(1500),
        };
        assert_eq!(status.remaining_secs(now), Some(2));
        assert_eq!(LockStatus::Active.remaining_secs(now), None);
    }

    #[test]
    fn test_lock_for_duration() {
        let (_store, clock, tracker) = setup(3);
        let until = tracker.lock_for("alice", Duration::days(30)).unwrap();
        assert_eq!(until, clock.now() + Duration::days(30));
        assert!(tracker.is_locked("alice").unwrap());
    }
}
