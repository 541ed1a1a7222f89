//! Authentication configuration
//!
//! Loaded once at process start and treated as read-only afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::auth::SessionConfig;
use crate::error::{Error, Result};
use crate::SUPERUSER_PERMISSION;

/// Upper bound for any configured time window (ten years)
pub const MAX_WINDOW_SECS: u64 = 10 * 365 * 24 * 3600;

/// Complete configuration for the authentication core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Password complexity rules
    pub password_policy: PasswordPolicyConfig,

    /// Failed-attempt lockout rules
    pub lockout_policy: LockoutPolicyConfig,

    /// Argon2 cost parameters for new verifiers
    pub hashing: HashingConfig,

    /// Session timeouts
    pub session: SessionConfig,

    /// Staff roles keyed by role id
    pub roles: BTreeMap<i64, RoleConfig>,
}

/// Password complexity rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicyConfig {
    /// Minimum number of characters
    pub min_length: usize,
    /// Require at least one uppercase letter
    pub require_upper: bool,
    /// Require at least one decimal digit
    pub require_digit: bool,
    /// Require at least one punctuation character
    pub require_special: bool,
}

impl Default for PasswordPolicyConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_upper: true,
            require_digit: true,
            require_special: true,
        }
    }
}

/// Failed-attempt lockout rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutPolicyConfig {
    /// Failures that trigger a lock
    pub max_attempts: u32,
    /// Length of the automatic lockout window (seconds)
    pub lock_duration_secs: u64,
    /// Length of an administrative block (seconds)
    pub admin_lock_duration_secs: u64,
}

impl Default for LockoutPolicyConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            lock_duration_secs: 30 * 60,                 // 30 minutes
            admin_lock_duration_secs: 30 * 24 * 60 * 60, // 30 days
        }
    }
}

impl LockoutPolicyConfig {
    /// Automatic lockout window
    pub fn lock_duration(&self) -> Duration {
        Duration::seconds(self.lock_duration_secs.min(MAX_WINDOW_SECS) as i64)
    }

    /// Administrative block window
    pub fn admin_lock_duration(&self) -> Duration {
        Duration::seconds(self.admin_lock_duration_secs.min(MAX_WINDOW_SECS) as i64)
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        // argon2 crate defaults (OWASP minimum for Argon2id)
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl HashingConfig {
    /// Lowest cost accepted by argon2, for tests only
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// A staff role and its permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Display name
    pub name: String,
    /// Granted permissions; "all" grants everything
    #[serde(default)]
    pub permissions: BTreeSet<String>,
}

impl RoleConfig {
    /// Build a role from a name and permission list
    pub fn new(name: &str, permissions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut roles = BTreeMap::new();
        roles.insert(1, RoleConfig::new("admin", &[SUPERUSER_PERMISSION]));
        roles.insert(
            2,
            RoleConfig::new(
                "manager",
                &["manage_bookings", "manage_guests", "view_reports"],
            ),
        );
        roles.insert(3, RoleConfig::new("maid", &["manage_cleaning"]));
        roles.insert(
            4,
            RoleConfig::new("receptionist", &["check_in_out", "view_guests"]),
        );

        Self {
            password_policy: PasswordPolicyConfig::default(),
            lockout_policy: LockoutPolicyConfig::default(),
            hashing: HashingConfig::default(),
            session: SessionConfig::default(),
            roles,
        }
    }
}

impl AuthConfig {
    /// Load configuration from a JSON file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load the file at `path`, writing the defaults there first if it is missing
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }
        Self::load(path)
    }

    /// Reject settings the core cannot enforce
    pub fn validate(&self) -> Result<()> {
        if self.password_policy.min_length == 0 {
            return Err(Error::Config("password_policy.min_length must be at least 1".into()));
        }

        let lockout = &self.lockout_policy;
        if lockout.max_attempts == 0 {
            return Err(Error::Config("lockout_policy.max_attempts must be at least 1".into()));
        }
        for (name, secs) in [
            ("lock_duration_secs", lockout.lock_duration_secs),
            ("admin_lock_duration_secs", lockout.admin_lock_duration_secs),
        ] {
            if secs == 0 || secs > MAX_WINDOW_SECS {
                return Err(Error::Config(format!(
                    "lockout_policy.{} must be between 1 and {}",
                    name, MAX_WINDOW_SECS
                )));
            }
        }

        let hashing = &self.hashing;
        argon2::Params::new(hashing.memory_kib, hashing.iterations, hashing.parallelism, None)
            .map_err(|e| Error::Config(format!("hashing: {}", e)))?;

        if self.session.idle_timeout_secs == 0 || self.session.max_duration_secs == 0 {
            return Err(Error::Config("session timeouts must be non-zero".into()));
        }

        for (role_id, role) in &self.roles {
            if role.name.trim().is_empty() {
                return Err(Error::Config(format!("role {} has an empty name", role_id)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_front_desk_settings() {
        let config = AuthConfig::default();
        assert_eq!(config.lockout_policy.max_attempts, 3);
        assert_eq!(config.lockout_policy.lock_duration(), Duration::minutes(30));
        assert_eq!(config.lockout_policy.admin_lock_duration(), Duration::days(30));
        assert_eq!(config.password_policy.min_length, 8);
        assert_eq!(config.roles.len(), 4);
        assert!(config.roles[&1].permissions.contains(SUPERUSER_PERMISSION));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("auth.json");

        let mut config = AuthConfig::default();
        config.lockout_policy.max_attempts = 5;
        config.save(&path).unwrap();

        let loaded = AuthConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let json = r#"{ "lockout_policy": { "max_attempts": 4 } }"#;
        let config: AuthConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.lockout_policy.max_attempts, 4);
        assert_eq!(config.lockout_policy.lock_duration_secs, 1800);
        assert_eq!(config.password_policy, PasswordPolicyConfig::default());
        assert_eq!(config.roles.len(), 4);
    }

    #[test]
    fn test_role_ids_parse_from_json_keys() {
        let json =
            r#"{ "roles": { "7": { "name": "night_audit", "permissions": ["view_reports"] } } }"#;
        let config: AuthConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.roles.len(), 1);
        assert_eq!(config.roles[&7].name, "night_audit");
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = AuthConfig::default();
        config.lockout_policy.max_attempts = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_hashing_params() {
        let mut config = AuthConfig::default();
        config.hashing.parallelism = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_init_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("auth.json");

        let config = AuthConfig::load_or_init(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config, AuthConfig::default());
    }
}
