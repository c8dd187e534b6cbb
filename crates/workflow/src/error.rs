//! Error types for the workflow crate.
//!
//! Variants follow how an operator has to respond, not which tool failed:
//!
//! - `Policy`: the requested configuration is refused; fix it and retrigger.
//! - `Capacity`: the target cannot hold the data; nothing was touched.
//! - `Transient`: an external tool failed; state is as before the step, so
//!   the same workflow can be retriggered.
//! - `FatalPrecondition`: the host is in a shape the workflow will not work
//!   around.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for workflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Workflow error types.
#[derive(Debug, Error)]
pub enum Error {
    #[error("policy violation: {reason}")]
    Policy { reason: String },

    #[error("not enough free space on '{mount}': {required} bytes required, {available} bytes free")]
    Capacity {
        mount: PathBuf,
        required: u64,
        available: u64,
    },

    #[error("{operation} failed: {reason}")]
    Transient { operation: String, reason: String },

    #[error("fatal precondition violated: {reason}")]
    FatalPrecondition { reason: String },

    #[error("resource '{name}' is not attached")]
    MissingResource { name: String },

    #[error("invalid value for option '{option}': {reason}")]
    InvalidConfig { option: String, reason: String },

    #[error("fact store error: {0}")]
    Store(#[from] drydock_events::Error),
}

impl Error {
    /// Create a policy violation error.
    pub fn policy(reason: impl Into<String>) -> Self {
        Self::Policy {
            reason: reason.into(),
        }
    }

    /// Create a capacity error.
    pub fn capacity(mount: impl Into<PathBuf>, required: u64, available: u64) -> Self {
        Self::Capacity {
            mount: mount.into(),
            required,
            available,
        }
    }

    /// Create a transient external-tool error.
    pub fn transient(operation: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Transient {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a fatal precondition error.
    pub fn fatal_precondition(reason: impl Into<String>) -> Self {
        Self::FatalPrecondition {
            reason: reason.into(),
        }
    }

    /// Create a missing resource error.
    pub fn missing_resource(name: impl Into<String>) -> Self {
        Self::MissingResource { name: name.into() }
    }

    /// Create an invalid config error.
    pub fn invalid_config(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            option: option.into(),
            reason: reason.into(),
        }
    }

    /// Whether retriggering the same workflow without operator action can
    /// succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Store(_))
    }
}

impl From<drydock_core::Error> for Error {
    fn from(err: drydock_core::Error) -> Self {
        Self::transient("host operation", err)
    }
}

impl From<Error> for drydock_events::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Store(inner) => inner,
            other => Self::reaction_failed(kind_of(&other), other.to_string()),
        }
    }
}

fn kind_of(err: &Error) -> &'static str {
    match err {
        Error::Policy { .. } => "policy",
        Error::Capacity { .. } => "capacity",
        Error::Transient { .. } => "transient",
        Error::FatalPrecondition { .. } => "fatal-precondition",
        Error::MissingResource { .. } => "missing-resource",
        Error::InvalidConfig { .. } => "invalid-config",
        Error::Store(_) => "store",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_display() {
        let err = Error::capacity("/srv/data", 500, 400);
        let text = err.to_string();
        assert!(text.contains("/srv/data"));
        assert!(text.contains("500"));
        assert!(text.contains("400"));
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(Error::transient("rsync", "exit 23").is_retryable());
        assert!(!Error::policy("htpasswd without TLS").is_retryable());
        assert!(!Error::fatal_precondition("not a directory").is_retryable());
    }

    #[test]
    fn test_host_errors_are_transient() {
        let err: Error = drydock_core::Error::command_spawn_failed("rsync", "not found").into();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("rsync"));
    }

    #[test]
    fn test_conversion_keeps_kind() {
        let err: drydock_events::Error = Error::policy("no TLS").into();
        let text = err.to_string();
        assert!(text.contains("policy"));
        assert!(text.contains("no TLS"));
    }
}
