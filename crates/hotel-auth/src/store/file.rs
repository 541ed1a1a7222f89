//! JSON file credential store
//!
//! The whole account table lives in one JSON document. Every access holds an
//! exclusive advisory lock on a sibling `.lock` file, so handles in separate
//! processes serialize their read-modify-write cycles. Writes go through a
//! uniquely named temporary file in the same directory and are renamed into
//! place.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::debug;

use super::table::{CredentialTable, TABLE_VERSION};
use super::{CredentialRecord, CredentialStore, NewCredential, StoreError};

/// Credential store persisted to a JSON file
#[derive(Debug)]
pub struct JsonFileCredentialStore {
    path: PathBuf,
    lock_path: PathBuf,
    guard: Mutex<()>,
}

/// Held for the duration of one store access; the file lock is released on drop
struct TableLock<'a> {
    _file: File,
    _guard: MutexGuard<'a, ()>,
}

impl JsonFileCredentialStore {
    /// Open (or prepare to create) the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut lock_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| OsString::from("credentials"));
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);

        let store = Self {
            path,
            lock_path,
            guard: Mutex::new(()),
        };
        // Fail early on an unreadable file rather than on first login
        store.read(|_| ())?;
        Ok(store)
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<TableLock<'_>, StoreError> {
        let guard = self
            .guard
            .lock()
            .map_err(|_| StoreError::Unavailable("credential file lock poisoned".into()))?;

        let mut options = OpenOptions::new();
        options.create(true).read(true).write(true).truncate(false);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(&self.lock_path)?;

        fs2::FileExt::lock_exclusive(&file).map_err(|e| {
            StoreError::Unavailable(format!(
                "cannot lock {}: {}",
                self.lock_path.display(),
                e
            ))
        })?;

        Ok(TableLock {
            _file: file,
            _guard: guard,
        })
    }

    fn read_table(&self) -> Result<CredentialTable, StoreError> {
        if !self.path.exists() {
            return Ok(CredentialTable::default());
        }

        let contents = fs::read_to_string(&self.path)?;
        let table: CredentialTable = serde_json::from_str(&contents)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e)))?;

        if table.version > TABLE_VERSION {
            return Err(StoreError::Corrupt(format!(
                "unsupported credential file version {}",
                table.version
            )));
        }
        Ok(table)
    }

    fn write_table(&self, table: &CredentialTable) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(table)
            .map_err(|e| StoreError::Corrupt(format!("Failed to serialize: {}", e)))?;

        // NamedTempFile is created 0600 on unix
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(contents.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        debug!(
            path = %self.path.display(),
            accounts = table.accounts.len(),
            "credential file written"
        );
        Ok(())
    }

    /// Run `op` against a fresh copy of the table and persist the result
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut CredentialTable) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _lock = self.lock()?;
        let mut table = self.read_table()?;
        let out = op(&mut table)?;
        self.write_table(&table)?;
        Ok(out)
    }

    fn read<T>(&self, op: impl FnOnce(&CredentialTable) -> T) -> Result<T, StoreError> {
        let _lock = self.lock()?;
        let table = self.read_table()?;
        Ok(op(&table))
    }
}

impl CredentialStore for JsonFileCredentialStore {
    fn lookup(&self, username: &str) -> Result<Option<CredentialRecord>, StoreError> {
        self.read(|t| t.lookup(username))
    }

    fn increment_failed_attempts(&self, username: &str) -> Result<u32, StoreError> {
        self.mutate(|t| t.increment_failed_attempts(username))
    }

    fn set_lock(&self, username: &str, until: DateTime<Utc>) -> Result<(), StoreError> {
        self.mutate(|t| t.set_lock(username, until))
    }

    fn clear_lock_and_reset(&self, username: &str) -> Result<(), StoreError> {
        self.mutate(|t| t.clear_lock_and_reset(username))
    }

    fn reset_after_success(&self, username: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.mutate(|t| t.reset_after_success(username, now))
    }

    fn insert(&self, new: NewCredential) -> Result<CredentialRecord, StoreError> {
        self.mutate(|t| t.insert(new))
    }

    fn set_verifier(&self, username: &str, verifier: &str) -> Result<(), StoreError> {
        self.mutate(|t| t.set_verifier(username, verifier))
    }

    fn set_role(&self, username: &str, role_id: i64) -> Result<(), StoreError> {
        self.mutate(|t| t.set_role(username, role_id))
    }

    fn list(&self) -> Result<Vec<CredentialRecord>, StoreError> {
        self.read(|t| t.list())
    }
}
