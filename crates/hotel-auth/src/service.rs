//! Front-desk authentication service
//!
//! Wires configuration, the credential store and the clock into the
//! individual components and exposes the operations the UI layer needs.

use std::sync::Arc;

use tracing::info;

use crate::accounts::AccountAdmin;
use crate::auth::{
    AuthError, Authenticator, CredentialHasher, Identity, LockStatus, LockoutPolicy,
    LockoutTracker, PasswordCheck, PasswordPolicy, Session,
};
use crate::authz::{AuthorizationEvaluator, Feature};
use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::store::CredentialStore;

/// Authentication, lockout and permission checks behind one handle
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    clock: Arc<dyn Clock>,
    policy: PasswordPolicy,
    lockout: LockoutTracker,
    authenticator: Authenticator,
    evaluator: Arc<AuthorizationEvaluator>,
    accounts: AccountAdmin,
}

impl AuthService {
    /// Build the service on the system clock
    pub fn new(config: AuthConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Build the service with an explicit clock
    pub fn with_clock(
        config: AuthConfig,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let policy = PasswordPolicy::new(config.password_policy.clone());
        let hasher =
            CredentialHasher::new(&config.hashing).map_err(|e| Error::Config(e.to_string()))?;
        let lockout = LockoutTracker::new(
            store.clone(),
            clock.clone(),
            LockoutPolicy::from(&config.lockout_policy),
        );
        let authenticator =
            Authenticator::new(store.clone(), clock.clone(), lockout.clone(), &hasher)
                .map_err(|e| Error::Config(e.to_string()))?;
        let evaluator = Arc::new(AuthorizationEvaluator::new(&config.roles));
        let accounts = AccountAdmin::new(
            store,
            clock.clone(),
            policy.clone(),
            hasher,
            evaluator.clone(),
            lockout.clone(),
            config.lockout_policy.clone(),
        );

        info!(
            roles = config.roles.len(),
            max_attempts = config.lockout_policy.max_attempts,
            "Authentication service ready"
        );

        Ok(Self {
            config,
            clock,
            policy,
            lockout,
            authenticator,
            evaluator,
            accounts,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Verify a login attempt
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> std::result::Result<Identity, AuthError> {
        self.authenticator.authenticate(username, password)
    }

    /// Check a candidate password against the complexity policy
    pub fn validate_password(&self, password: &str) -> PasswordCheck {
        self.policy.validate(password)
    }

    /// Whether `role_id` may use `permission`
    pub fn can(&self, role_id: i64, permission: &str) -> bool {
        self.evaluator.can(role_id, permission)
    }

    /// Dashboard sections visible to `role_id`
    pub fn visible_features(&self, role_id: i64) -> Vec<Feature> {
        self.evaluator.visible_features(role_id)
    }

    /// Display name of a role
    pub fn role_name(&self, role_id: i64) -> Option<&str> {
        self.evaluator.role_name(role_id)
    }

    /// Permission evaluator shared by every screen
    pub fn evaluator(&self) -> &AuthorizationEvaluator {
        &self.evaluator
    }

    /// Whether `username` is currently locked; unknown usernames are not
    pub fn is_locked(&self, username: &str) -> std::result::Result<bool, AuthError> {
        self.lockout.is_locked(username).map_err(AuthError::unavailable)
    }

    /// Lock state of `username` with its expiry
    pub fn lock_status(&self, username: &str) -> std::result::Result<LockStatus, AuthError> {
        self.lockout.lock_status(username).map_err(AuthError::unavailable)
    }

    /// Clear the lock and failure counter of `username`
    pub fn manual_unlock(&self, username: &str) -> std::result::Result<(), AuthError> {
        self.lockout
            .manual_unlock(username)
            .map_err(AuthError::from_admin_store)
    }

    /// Open a session for a verified identity
    pub fn start_session(&self, identity: Identity) -> Session {
        Session::new(identity, self.config.session.clone(), self.clock.clone())
    }

    /// Staff account administration
    pub fn accounts(&self) -> &AccountAdmin {
        &self.accounts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::HashingConfig;
    use crate::store::MemoryCredentialStore;
    use chrono::Duration;

    fn service() -> (Arc<ManualClock>, AuthService, Identity) {
        let mut config = AuthConfig::default();
        config.hashing = HashingConfig::insecure_fast();
        let clock = Arc::new(ManualClock::default());
        let service =
            AuthService::with_clock(config, Arc::new(MemoryCredentialStore::new()), clock.clone())
                .unwrap();
        let root = service.accounts().bootstrap_admin("root", "Root#2024").unwrap();
        (clock, service, root)
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AuthConfig::default();
        config.lockout_policy.max_attempts = 0;
        let result = AuthService::new(config, Arc::new(MemoryCredentialStore::new()));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_login_and_session() {
        let (clock, service, root) = service();
        let identity = service.authenticate("root", "Root#2024").unwrap();
        assert_eq!(identity, root);

        let session = service.start_session(identity);
        assert!(session.is_valid());
        clock.advance(Duration::minutes(16));
        assert!(!session.is_valid());
    }

    #[test]
    fn test_lockout_through_service() {
        let (clock, service, _root) = service();
        for _ in 0..3 {
            let _ = service.authenticate("root", "nope");
        }
        assert!(service.is_locked("root").unwrap());
        assert!(service.lock_status("root").unwrap().is_locked());

        service.manual_unlock("root").unwrap();
        assert!(!service.is_locked("root").unwrap());

        for _ in 0..3 {
            let _ = service.authenticate("root", "nope");
        }
        clock.advance(Duration::minutes(30));
        assert!(!service.is_locked("root").unwrap());
        assert!(service.authenticate("root", "Root#2024").is_ok());
    }

    #[test]
    fn test_permissions_and_features() {
        let (_clock, service, root) = service();
        assert!(service.can(root.role_id(), "anything"));
        assert!(!service.can(4, "manage_rooms"));
        assert_eq!(service.visible_features(3), vec![Feature::Cleaning]);
        assert_eq!(service.role_name(4), Some("receptionist"));
    }

    #[test]
    fn test_validate_password() {
        let (_clock, service, _root) = service();
        assert!(service.validate_password("Abcdef1!").ok);
        assert_eq!(service.validate_password("abc").reasons.len(), 4);
    }

    #[test]
    fn test_unlock_unknown_account() {
        let (_clock, service, _root) = service();
        assert_eq!(
            service.manual_unlock("ghost"),
            Err(AuthError::UnknownAccount("ghost".into()))
        );
    }
}
