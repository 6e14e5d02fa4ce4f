//! Error types shared by the role graph crates
//!
//! Covers entity validation and snapshot (de)serialization. Engine-level
//! failures (unknown references, cycles) live in `rolegraph-authz`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for role and permission data
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity failed validation
    #[error("Invalid: {0}")]
    Invalid(String),

    /// Snapshot could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Create an invalid error
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        CoreError::Invalid(msg.into())
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        CoreError::Serialization(msg.into())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}
