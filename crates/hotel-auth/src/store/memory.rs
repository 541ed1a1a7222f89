//! In-memory credential store

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::table::CredentialTable;
use super::{CredentialRecord, CredentialStore, NewCredential, StoreError};

/// Credential store held entirely in process memory
///
/// Each operation runs under a single mutex, so every mutation is atomic.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    table: Mutex<CredentialTable>,
}

impl MemoryCredentialStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> Result<MutexGuard<'_, CredentialTable>, StoreError> {
        self.table
            .lock()
            .map_err(|_| StoreError::Unavailable("credential table lock poisoned".into()))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn lookup(&self, username: &str) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.table()?.lookup(username))
    }

    fn increment_failed_attempts(&self, username: &str) -> Result<u32, StoreError> {
        self.table()?.increment_failed_attempts(username)
    }

    fn set_lock(&self, username: &str, until: DateTime<Utc>) -> Result<(), StoreError> {
        self.table()?.set_lock(username, until)
    }

    fn clear_lock_and_reset(&self, username: &str) -> Result<(), StoreError> {
        self.table()?.clear_lock_and_reset(username)
    }

    fn reset_after_success(&self, username: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.table()?.reset_after_success(username, now)
    }

    fn insert(&self, new: NewCredential) -> Result<CredentialRecord, StoreError> {
        self.table()?.insert(new)
    }

    fn set_verifier(&self, username: &str, verifier: &str) -> Result<(), StoreError> {
        self.table()?.set_verifier(username, verifier)
    }

    fn set_role(&self, username: &str, role_id: i64) -> Result<(), StoreError> {
        self.table()?.set_role(username, role_id)
    }

    fn list(&self) -> Result<Vec<CredentialRecord>, StoreError> {
        Ok(self.table()?.list())
    }
}
