//! Session management for logged-in staff
//!
//! Sessions have idle and absolute timeouts to limit how long an unattended
//! front-desk workstation stays logged in. They live only in process memory.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{AuthError, Identity};
use crate::clock::Clock;

/// Session configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle timeout (seconds)
    pub idle_timeout_secs: u64,
    /// Maximum session duration (seconds)
    pub max_duration_secs: u64,
    /// Warning period before timeout (seconds)
    pub warning_period_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 15 * 60,   // 15 minutes
            max_duration_secs: 12 * 3600, // one shift
            warning_period_secs: 60,      // 1 minute warning
        }
    }
}

impl SessionConfig {
    /// Create a stricter configuration for shared terminals
    pub fn strict() -> Self {
        Self {
            idle_timeout_secs: 5 * 60,
            max_duration_secs: 4 * 3600,
            warning_period_secs: 30,
        }
    }

    fn idle_timeout(&self) -> Duration {
        secs(self.idle_timeout_secs)
    }

    fn max_duration(&self) -> Duration {
        secs(self.max_duration_secs)
    }

    fn warning_period(&self) -> Duration {
        secs(self.warning_period_secs)
    }
}

fn secs(value: u64) -> Duration {
    Duration::seconds(value.min(crate::config::MAX_WINDOW_SECS) as i64)
}

/// Authenticated session for one staff member
pub struct Session {
    identity: Identity,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
}

impl Session {
    /// Start a session for a freshly authenticated identity
    pub fn new(identity: Identity, config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            identity,
            created_at: now,
            last_activity: now,
            config,
            clock,
        }
    }

    /// The logged-in identity
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// When the session started
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Touch the session (update last activity time)
    pub fn touch(&mut self) {
        self.last_activity = self.clock.now();
    }

    /// Check if the session is still valid
    pub fn is_valid(&self) -> bool {
        let now = self.clock.now();

        // Check absolute timeout
        if now - self.created_at > self.config.max_duration() {
            return false;
        }

        // Check idle timeout
        now - self.last_activity <= self.config.idle_timeout()
    }

    /// Get time until session expires (minimum of idle and absolute timeout)
    pub fn time_until_expiry(&self) -> Duration {
        let now = self.clock.now();
        let absolute_remaining = self.config.max_duration() - (now - self.created_at);
        let idle_remaining = self.config.idle_timeout() - (now - self.last_activity);
        absolute_remaining.min(idle_remaining).max(Duration::zero())
    }

    /// Check if we're within the warning period
    pub fn should_warn(&self) -> bool {
        self.time_until_expiry() <= self.config.warning_period()
    }

    /// Validate session and touch if valid
    pub fn validate_and_touch(&mut self) -> Result<Identity, AuthError> {
        if !self.is_valid() {
            return Err(AuthError::SessionExpired);
        }
        self.touch();
        Ok(self.identity)
    }
}
