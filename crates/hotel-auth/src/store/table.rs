//! Account table shared by the in-process store adapters

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CredentialRecord, NewCredential, StoreError};

/// Current on-disk format version
pub(crate) const TABLE_VERSION: u32 = 1;

/// Accounts keyed by username
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CredentialTable {
    /// Format version for future migrations
    pub version: u32,
    /// Next user id to hand out
    pub next_user_id: i64,
    /// Accounts by username
    pub accounts: BTreeMap<String, CredentialRecord>,
}

impl Default for CredentialTable {
    fn default() -> Self {
        Self {
            version: TABLE_VERSION,
            next_user_id: 1,
            accounts: BTreeMap::new(),
        }
    }
}

impl CredentialTable {
    pub fn lookup(&self, username: &str) -> Option<CredentialRecord> {
        self.accounts.get(username).cloned()
    }

    fn get_mut(&mut self, username: &str) -> Result<&mut CredentialRecord, StoreError> {
        self.accounts
            .get_mut(username)
            .ok_or_else(|| StoreError::UnknownAccount(username.to_string()))
    }

    pub fn increment_failed_attempts(&mut self, username: &str) -> Result<u32, StoreError> {
        let record = self.get_mut(username)?;
        record.failed_attempts = record.failed_attempts.saturating_add(1);
        Ok(record.failed_attempts)
    }

    pub fn set_lock(&mut self, username: &str, until: DateTime<Utc>) -> Result<(), StoreError> {
        self.get_mut(username)?.locked_until = Some(until);
        Ok(())
    }

    pub fn clear_lock_and_reset(&mut self, username: &str) -> Result<(), StoreError> {
        let record = self.get_mut(username)?;
        record.locked_until = None;
        record.failed_attempts = 0;
        Ok(())
    }

    pub fn reset_after_success(
        &mut self,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let record = self.get_mut(username)?;
        record.failed_attempts = 0;
        if !record.is_locked_at(now) {
            record.locked_until = None;
        }
        Ok(())
    }

    pub fn insert(&mut self, new: NewCredential) -> Result<CredentialRecord, StoreError> {
        if self.accounts.contains_key(&new.username) {
            return Err(StoreError::Duplicate(new.username));
        }

        let record = CredentialRecord {
            user_id: self.next_user_id,
            username: new.username,
            verifier: new.verifier,
            failed_attempts: 0,
            locked_until: None,
            role_id: new.role_id,
        };
        self.next_user_id += 1;
        self.accounts.insert(record.username.clone(), record.clone());
        Ok(record)
    }

    pub fn set_verifier(&mut self, username: &str, verifier: &str) -> Result<(), StoreError> {
        self.get_mut(username)?.verifier = verifier.to_string();
        Ok(())
    }

    pub fn set_role(&mut self, username: &str, role_id: i64) -> Result<(), StoreError> {
        self.get_mut(username)?.role_id = role_id;
        Ok(())
    }

    pub fn list(&self) -> Vec<CredentialRecord> {
        let mut records: Vec<_> = self.accounts.values().cloned().collect();
        records.sort_by_key(|r| r.user_id);
        records
    }
}
