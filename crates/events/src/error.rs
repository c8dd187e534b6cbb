//! Error types for the events crate.

use std::fmt;
use thiserror::Error;

/// Result type alias for event bus and fact store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Connection error for the embedded fact database.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConnectionError {
    #[error("invalid store path: {0}")]
    InvalidPath(String),

    #[error("fact store is locked by another process; if none is running, delete the LOCK file at: {path}")]
    Locked { path: String },

    #[error("database initialization failed: {reason}")]
    InitializationFailed { reason: String },
}

/// Event bus and fact store error types.
#[derive(Debug, Clone)]
pub enum Error {
    /// Fact store operation failed.
    StoreFailed { operation: String, reason: String },
    /// Stored data could not be (de)serialised.
    Serialization { reason: String },
    /// A reaction reported a failure of the given kind.
    ReactionFailed { kind: String, reason: String },
    /// Bus configuration is invalid.
    InvalidConfig { reason: String },
    /// Connection error.
    Connection(ConnectionError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreFailed { operation, reason } => {
                write!(f, "fact store operation '{operation}' failed: {reason}")
            }
            Self::Serialization { reason } => {
                write!(f, "serialization error: {reason}")
            }
            Self::ReactionFailed { kind, reason } => {
                write!(f, "reaction failed ({kind}): {reason}")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid bus configuration: {reason}")
            }
            Self::Connection(err) => {
                write!(f, "connection error: {err}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Self::Connection(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl Error {
    /// Create a store failed error.
    pub fn store_failed(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StoreFailed {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization {
            reason: reason.into(),
        }
    }

    /// Create a reaction failed error.
    pub fn reaction_failed(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ReactionFailed {
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::store_failed("apply", "disk full");
        assert!(err.to_string().contains("apply"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_locked_error_names_lock_file() {
        let err = Error::from(ConnectionError::Locked {
            path: "/var/lib/drydock/facts/LOCK".to_string(),
        });
        assert!(err.to_string().contains("/var/lib/drydock/facts/LOCK"));
    }
}
