//! Host I/O error types.
//!
//! All errors are explicit and typed; callers decide whether a failure is
//! transient or fatal.

use std::path::PathBuf;

use thiserror::Error;

/// Error raised by host-facing operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read file '{path}': {reason}")]
    FileReadFailed { path: PathBuf, reason: String },

    #[error("failed to write file '{path}': {reason}")]
    FileWriteFailed { path: PathBuf, reason: String },

    #[error("failed to create directory '{path}': {reason}")]
    DirectoryCreationFailed { path: PathBuf, reason: String },

    #[error("failed to rename '{from}' to '{to}': {reason}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },

    #[error("failed to link '{link}' to '{target}': {reason}")]
    LinkFailed {
        link: PathBuf,
        target: PathBuf,
        reason: String,
    },

    #[error("failed to query disk usage of '{path}': {reason}")]
    DiskUsageFailed { path: PathBuf, reason: String },

    #[error("command '{command}' could not be spawned: {reason}")]
    CommandSpawnFailed { command: String, reason: String },

    #[error("command '{command}' exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("invalid record: {reason}")]
    InvalidRecord { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a file read error.
    pub fn file_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a file write error.
    pub fn file_write_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileWriteFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a directory creation error.
    pub fn directory_creation_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DirectoryCreationFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a rename error.
    pub fn rename_failed(
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::RenameFailed {
            from: from.into(),
            to: to.into(),
            reason: reason.into(),
        }
    }

    /// Create a symlink error.
    pub fn link_failed(
        link: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::LinkFailed {
            link: link.into(),
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Create a disk usage error.
    pub fn disk_usage_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DiskUsageFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a spawn error.
    pub fn command_spawn_failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CommandSpawnFailed {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Create a non-zero exit error.
    pub fn command_failed(
        command: impl Into<String>,
        status: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            status: status.into(),
            stderr: stderr.into(),
        }
    }

    /// Create an invalid record error.
    pub fn invalid_record(reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display() {
        let err = Error::command_failed("rsync -a", "exit status: 23", "partial transfer");
        let text = err.to_string();
        assert!(text.contains("rsync -a"));
        assert!(text.contains("23"));
        assert!(text.contains("partial transfer"));
    }

    #[test]
    fn test_rename_failed_names_both_paths() {
        let err = Error::rename_failed("/var/lib/docker", "/var/lib/docker-1", "busy");
        let text = err.to_string();
        assert!(text.contains("/var/lib/docker'"));
        assert!(text.contains("/var/lib/docker-1"));
    }

    #[test]
    fn test_io_conversion() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
