//! Error hierarchy: one enum per layer, converted to an HTTP status
//! only at the server edge (not in this crate).

use thiserror::Error;

/// Errors the data-access port may raise.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("conflict on write: {0}")]
    ConflictOnWrite(String),
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Configuration validation errors, raised at process start-up.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Invalid(e.to_string())
    }
}

/// Run-level failure. A store failure here means the run had no partial
/// effect: `clear_matches` + `persist_matches` is one logical transaction.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Store(#[from] StoreError),
}
