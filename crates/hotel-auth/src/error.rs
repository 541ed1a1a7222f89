//! Error types for configuration and storage plumbing
//!
//! Authentication outcomes use [`crate::auth::AuthError`]; this type covers
//! the surrounding file and configuration handling.

use thiserror::Error;

use crate::store::StoreError;

/// Result type alias for hotel-auth plumbing
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configuration or opening stores
#[derive(Debug, Error)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration rejected by validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
