//! Staff account administration
//!
//! Creating accounts, blocking and unblocking them, changing roles and
//! listing staff are superuser actions. Changing a password is open to the
//! account owner as well.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::auth::{AuthError, CredentialHasher, Identity, LockoutTracker, PasswordPolicy};
use crate::authz::AuthorizationEvaluator;
use crate::clock::Clock;
use crate::config::LockoutPolicyConfig;
use crate::store::{CredentialRecord, CredentialStore, NewCredential};

/// Display name used for role ids missing from the configuration
pub const UNKNOWN_ROLE_NAME: &str = "unknown role";

/// Whether an account can currently log in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AccountStatus {
    Active,
    Locked,
}

/// One row of the staff list
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub user_id: i64,
    pub username: String,
    pub role_id: i64,
    pub role_name: String,
    pub status: AccountStatus,
    pub locked_until: Option<DateTime<Utc>>,
    pub failed_attempts: u32,
}

/// Administrative operations on staff accounts
#[derive(Clone)]
pub struct AccountAdmin {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    policy: PasswordPolicy,
    hasher: CredentialHasher,
    evaluator: Arc<AuthorizationEvaluator>,
    lockout: LockoutTracker,
    lockout_config: LockoutPolicyConfig,
}

impl AccountAdmin {
    /// Assemble the administration surface from shared components
    pub fn new(
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        policy: PasswordPolicy,
        hasher: CredentialHasher,
        evaluator: Arc<AuthorizationEvaluator>,
        lockout: LockoutTracker,
        lockout_config: LockoutPolicyConfig,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
            hasher,
            evaluator,
            lockout,
            lockout_config,
        }
    }

    fn require_superuser(&self, actor: &Identity, action: &str) -> Result<(), AuthError> {
        if self.evaluator.is_superuser(actor.role_id()) {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied(format!(
                "{} requires an administrator",
                action
            )))
        }
    }

    fn require_role(&self, role_id: i64) -> Result<(), AuthError> {
        match self.evaluator.role(role_id) {
            Some(_) => Ok(()),
            None => Err(AuthError::UnknownRole(role_id)),
        }
    }

    fn find(&self, username: &str) -> Result<CredentialRecord, AuthError> {
        self.store
            .lookup(username)
            .map_err(AuthError::from_admin_store)?
            .ok_or_else(|| AuthError::UnknownAccount(username.to_string()))
    }

    fn check_new_password(&self, password: &str, confirm: &str) -> Result<(), AuthError> {
        if password != confirm {
            return Err(AuthError::PasswordMismatch);
        }
        self.policy.validate(password).into_result()
    }

    /// Create the first administrator on an empty store
    pub fn bootstrap_admin(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput);
        }
        if !self.store.list().map_err(AuthError::from_admin_store)?.is_empty() {
            return Err(AuthError::PermissionDenied(
                "accounts already exist; log in as an administrator".into(),
            ));
        }
        let role_id = self.evaluator.superuser_role().ok_or_else(|| {
            AuthError::PermissionDenied("no role with the \"all\" permission is configured".into())
        })?;
        self.policy.validate(password).into_result()?;

        let record = self.insert(username, password, role_id)?;
        info!(username, user_id = record.user_id, "Bootstrapped administrator account");
        Ok(Identity::new(record.user_id, record.role_id))
    }

    fn insert(
        &self,
        username: &str,
        password: &str,
        role_id: i64,
    ) -> Result<CredentialRecord, AuthError> {
        let verifier = self.hasher.hash(password)?;
        self.store
            .insert(NewCredential {
                username: username.to_string(),
                verifier,
                role_id,
            })
            .map_err(AuthError::from_admin_store)
    }

    /// Create a staff account
    pub fn create_account(
        &self,
        actor: &Identity,
        username: &str,
        password: &str,
        confirm: &str,
        role_id: i64,
    ) -> Result<AccountSummary, AuthError> {
        self.require_superuser(actor, "creating accounts")?;

        let username = username.trim();
        if username.is_empty() || password.is_empty() || confirm.is_empty() {
            return Err(AuthError::InvalidInput);
        }
        self.check_new_password(password, confirm)?;
        self.require_role(role_id)?;

        let record = self.insert(username, password, role_id)?;
        info!(
            username,
            user_id = record.user_id,
            role_id,
            created_by = actor.user_id(),
            "Account created"
        );
        Ok(self.summarize(record, self.clock.now()))
    }

    /// Replace an account's password after checking the current one
    ///
    /// A wrong current password is reported as `InvalidCredentials` and does
    /// not count towards lockout.
    pub fn change_password(
        &self,
        actor: &Identity,
        username: &str,
        current: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<(), AuthError> {
        if username.is_empty()
            || current.is_empty()
            || new_password.is_empty()
            || confirm.is_empty()
        {
            return Err(AuthError::InvalidInput);
        }

        let is_admin = self.evaluator.is_superuser(actor.role_id());
        let record = match self.find(username) {
            Ok(record) => record,
            Err(AuthError::UnknownAccount(_)) if !is_admin => {
                return Err(AuthError::PermissionDenied(
                    "staff may only change their own password".into(),
                ))
            }
            Err(e) => return Err(e),
        };
        if record.user_id != actor.user_id() && !is_admin {
            return Err(AuthError::PermissionDenied(
                "staff may only change their own password".into(),
            ));
        }

        self.check_new_password(new_password, confirm)?;

        let matches = self
            .store
            .verify(current, &record.verifier)
            .map_err(AuthError::from_admin_store)?;
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        let verifier = self.hasher.hash(new_password)?;
        self.store
            .set_verifier(username, &verifier)
            .map_err(AuthError::from_admin_store)?;
        info!(username, changed_by = actor.user_id(), "Password changed");
        Ok(())
    }

    /// Block an account for the administrative lock period
    pub fn lock_account(
        &self,
        actor: &Identity,
        username: &str,
    ) -> Result<DateTime<Utc>, AuthError> {
        self.require_superuser(actor, "blocking accounts")?;
        self.find(username)?;
        self.lockout
            .lock_for(username, self.lockout_config.admin_lock_duration())
            .map_err(AuthError::from_admin_store)
    }

    /// Lift any lock and reset the failure counter
    pub fn unlock_account(&self, actor: &Identity, username: &str) -> Result<(), AuthError> {
        self.require_superuser(actor, "unblocking accounts")?;
        self.lockout
            .manual_unlock(username)
            .map_err(AuthError::from_admin_store)
    }

    /// Move an account to another role
    pub fn set_role(
        &self,
        actor: &Identity,
        username: &str,
        role_id: i64,
    ) -> Result<(), AuthError> {
        self.require_superuser(actor, "changing roles")?;
        self.require_role(role_id)?;
        self.store
            .set_role(username, role_id)
            .map_err(AuthError::from_admin_store)?;
        info!(username, role_id, changed_by = actor.user_id(), "Role changed");
        Ok(())
    }

    /// All staff accounts ordered by user id
    pub fn list_accounts(&self, actor: &Identity) -> Result<Vec<AccountSummary>, AuthError> {
        self.require_superuser(actor, "listing accounts")?;
        let now = self.clock.now();
        let records = self.store.list().map_err(AuthError::from_admin_store)?;
        Ok(records.into_iter().map(|r| self.summarize(r, now)).collect())
    }

    fn summarize(&self, record: CredentialRecord, now: DateTime<Utc>) -> AccountSummary {
        let status = if record.is_locked_at(now) {
            AccountStatus::Locked
        } else {
            AccountStatus::Active
        };
        AccountSummary {
            user_id: record.user_id,
            role_name: self
                .evaluator
                .role_name(record.role_id)
                .unwrap_or(UNKNOWN_ROLE_NAME)
                .to_string(),
            username: record.username,
            role_id: record.role_id,
            status,
            locked_until: record.locked_until,
            failed_attempts: record.failed_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::LockoutPolicy;
    use crate::clock::ManualClock;
    use crate::config::{AuthConfig, HashingConfig};
    use crate::store::MemoryCredentialStore;
    use chrono::Duration;

    struct Fixture {
        store: Arc<MemoryCredentialStore>,
        clock: Arc<ManualClock>,
        admin: AccountAdmin,
        root: Identity,
    }

    fn fixture() -> Fixture {
        let config = AuthConfig::default();
        let store = Arc::new(MemoryCredentialStore::new());
        let clock = Arc::new(ManualClock::default());
        let lockout = LockoutTracker::new(
            store.clone(),
            clock.clone(),
            LockoutPolicy::from(&config.lockout_policy),
        );
        let admin = AccountAdmin::new(
            store.clone(),
            clock.clone(),
            PasswordPolicy::new(config.password_policy.clone()),
            CredentialHasher::new(&HashingConfig::insecure_fast()).unwrap(),
            Arc::new(AuthorizationEvaluator::new(&config.roles)),
            lockout,
            config.lockout_policy.clone(),
        );
        let root = admin.bootstrap_admin("root", "Root#2024").unwrap();
        Fixture {
            store,
            clock,
            admin,
            root,
        }
    }

    #[test]
    fn test_bootstrap_only_on_empty_store() {
        let f = fixture();
        assert_eq!(f.root.role_id(), 1);
        assert!(matches!(
            f.admin.bootstrap_admin("second", "Second#2024"),
            Err(AuthError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_create_account() {
        let f = fixture();
        let summary = f
            .admin
            .create_account(&f.root, "  maria ", "Clean#123", "Clean#123", 3)
            .unwrap();
        assert_eq!(summary.username, "maria");
        assert_eq!(summary.role_name, "maid");
        assert_eq!(summary.status, AccountStatus::Active);
        assert!(f.store.lookup("maria").unwrap().is_some());
    }

    #[test]
    fn test_create_account_validation_order() {
        let f = fixture();
        assert_eq!(
            f.admin.create_account(&f.root, "", "Clean#123", "Clean#123", 3),
            Err(AuthError::InvalidInput)
        );
        assert_eq!(
            f.admin.create_account(&f.root, "maria", "Clean#123", "Clean#124", 3),
            Err(AuthError::PasswordMismatch)
        );
        assert!(matches!(
            f.admin.create_account(&f.root, "maria", "clean", "clean", 3),
            Err(AuthError::PolicyViolation(_))
        ));
        assert_eq!(
            f.admin.create_account(&f.root, "maria", "Clean#123", "Clean#123", 42),
            Err(AuthError::UnknownRole(42))
        );
        assert_eq!(
            f.admin.create_account(&f.root, "root", "Clean#123", "Clean#123", 3),
            Err(AuthError::AccountExists("root".into()))
        );
    }

    #[test]
    fn test_non_admin_cannot_administer() {
        let f = fixture();
        let summary = f
            .admin
            .create_account(&f.root, "maria", "Clean#123", "Clean#123", 3)
            .unwrap();
        let maid = Identity::new(summary.user_id, 3);

        assert!(matches!(
            f.admin.create_account(&maid, "x", "Clean#123", "Clean#123", 3),
            Err(AuthError::PermissionDenied(_))
        ));
        assert!(matches!(f.admin.lock_account(&maid, "root"), Err(AuthError::PermissionDenied(_))));
        assert!(matches!(f.admin.list_accounts(&maid), Err(AuthError::PermissionDenied(_))));
        assert!(matches!(f.admin.set_role(&maid, "maria", 1), Err(AuthError::PermissionDenied(_))));
    }

    #[test]
    fn test_lock_and_unlock() {
        let f = fixture();
        f.admin
            .create_account(&f.root, "maria", "Clean#123", "Clean#123", 3)
            .unwrap();

        let until = f.admin.lock_account(&f.root, "maria").unwrap();
        assert_eq!(until, f.clock.now() + Duration::days(30));

        let listed = f.admin.list_accounts(&f.root).unwrap();
        assert_eq!(listed[1].status, AccountStatus::Locked);

        f.admin.unlock_account(&f.root, "maria").unwrap();
        let listed = f.admin.list_accounts(&f.root).unwrap();
        assert_eq!(listed[1].status, AccountStatus::Active);
        assert_eq!(listed[1].locked_until, None);
    }

    #[test]
    fn test_lock_unknown_account() {
        let f = fixture();
        assert_eq!(
            f.admin.lock_account(&f.root, "ghost"),
            Err(AuthError::UnknownAccount("ghost".into()))
        );
    }

    #[test]
    fn test_change_own_password() {
        let f = fixture();
        let summary = f
            .admin
            .create_account(&f.root, "maria", "Clean#123", "Clean#123", 3)
            .unwrap();
        let maid = Identity::new(summary.user_id, 3);

        assert_eq!(
            f.admin.change_password(&maid, "maria", "wrong", "Fresh#456", "Fresh#456"),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(f.store.lookup("maria").unwrap().unwrap().failed_attempts, 0);

        f.admin
            .change_password(&maid, "maria", "Clean#123", "Fresh#456", "Fresh#456")
            .unwrap();
        let verifier = f.store.lookup("maria").unwrap().unwrap().verifier;
        assert!(crate::auth::verify_password("Fresh#456", &verifier));
    }

    #[test]
    fn test_staff_cannot_change_others_password() {
        let f = fixture();
        let summary = f
            .admin
            .create_account(&f.root, "maria", "Clean#123", "Clean#123", 3)
            .unwrap();
        let maid = Identity::new(summary.user_id, 3);

        assert!(matches!(
            f.admin.change_password(&maid, "root", "Root#2024", "Fresh#456", "Fresh#456"),
            Err(AuthError::PermissionDenied(_))
        ));
        assert!(matches!(
            f.admin.change_password(&maid, "ghost", "x", "Fresh#456", "Fresh#456"),
            Err(AuthError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_set_role() {
        let f = fixture();
        f.admin
            .create_account(&f.root, "maria", "Clean#123", "Clean#123", 3)
            .unwrap();
        f.admin.set_role(&f.root, "maria", 4).unwrap();
        assert_eq!(f.store.lookup("maria").unwrap().unwrap().role_id, 4);
        assert_eq!(f.admin.set_role(&f.root, "maria", 9), Err(AuthError::UnknownRole(9)));
    }

    #[test]
    fn test_dangling_role_listed_as_unknown() {
        let f = fixture();
        f.store
            .insert(NewCredential {
                username: "legacy".into(),
                verifier: "x".into(),
                role_id: 77,
            })
            .unwrap();
        let listed = f.admin.list_accounts(&f.root).unwrap();
        assert_eq!(listed[1].role_name, UNKNOWN_ROLE_NAME);
    }
}
