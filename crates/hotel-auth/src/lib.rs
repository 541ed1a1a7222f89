//! Hotel Auth - staff authentication and permissions for the hotel front desk
//!
//! This crate is the security core of the front-desk application:
//! - Password complexity policy
//! - Failed-login tracking with time-boxed account lockout
//! - Credential verification against an injected credential store
//! - Role-based permission checks for screens and actions
//! - Staff account administration and in-memory sessions
//!
//! Persistence is delegated to a [`store::CredentialStore`] handle passed in
//! by the caller; nothing in this crate holds a process-wide connection.

pub mod accounts;
pub mod auth;
pub mod authz;
pub mod clock;
pub mod config;
pub mod error;
pub mod service;
pub mod store;

pub use accounts::{AccountAdmin, AccountStatus, AccountSummary};
pub use auth::{
    AuthError, Authenticator, Identity, LockStatus, LockoutTracker, PasswordCheck, PasswordPolicy,
    PasswordRule, Session,
};
pub use authz::{AuthorizationEvaluator, Feature, Role};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AuthConfig;
pub use error::{Error, Result};
pub use service::AuthService;
pub use store::{
    CredentialRecord, CredentialStore, JsonFileCredentialStore, MemoryCredentialStore,
    NewCredential, StoreError,
};

/// Permission value that grants every capability to a role
pub const SUPERUSER_PERMISSION: &str = "all";
