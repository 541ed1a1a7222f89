//! Shared fixtures for the Hotel Desk integration tests

use std::path::Path;
use std::sync::Arc;

use hotel_auth::{
    config::HashingConfig, AuthConfig, AuthService, JsonFileCredentialStore, ManualClock,
};

/// Credential file name used by the fixtures
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Default config with cheap hashing so tests stay fast
pub fn test_config() -> AuthConfig {
    let mut config = AuthConfig::default();
    config.hashing = HashingConfig::insecure_fast();
    config
}

/// Open a service over the file store in `dir`, driven by `clock`
///
/// Opening the same directory twice simulates an application restart.
pub fn open_desk(dir: &Path, clock: Arc<ManualClock>) -> AuthService {
    let store = JsonFileCredentialStore::open(dir.join(CREDENTIALS_FILE))
        .expect("credential store should open");
    AuthService::with_clock(test_config(), Arc::new(store), clock)
        .expect("test config should be valid")
}
