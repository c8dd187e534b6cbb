//! Collaborator interfaces consumed by the workflows.
//!
//! Every trait here is a thin seam over a host facility: the container
//! runtime, the hook tools of the hosting framework, the filesystem. The
//! `system` module implements them against the real host; `fakes` provides
//! recording doubles for tests.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use drydock_core::Result;
use serde::{Deserialize, Serialize};

/// Brings the registry containers up and down.
///
/// Both operations are idempotent: bringing up a running service or down a
/// stopped one is a no-op.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Start the service described by the launch specification.
    async fn bring_up(&self, launch_spec: &Path) -> Result<()>;

    /// Stop the service described by the launch specification.
    async fn bring_down(&self, launch_spec: &Path) -> Result<()>;

    /// Load an image tarball into the runtime.
    async fn load_image(&self, image: &Path) -> Result<()>;
}

/// Controls the container runtime daemon itself.
#[async_trait]
pub trait RuntimeDaemon: Send + Sync {
    /// Stop the daemon; nothing holds the data directory afterwards.
    async fn stop(&self) -> Result<()>;

    /// Start the daemon.
    async fn start(&self) -> Result<()>;
}

/// Workload status as shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Maintenance,
    Blocked,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Maintenance => f.write_str("maintenance"),
            Self::Blocked => f.write_str("blocked"),
        }
    }
}

/// User-visible status channel. Reporting never fails the caller.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    /// Publish a status and message.
    async fn report(&self, status: Status, message: &str);
}

/// Opens and closes the service port on the host firewall/model.
#[async_trait]
pub trait PortExposure: Send + Sync {
    /// Expose a TCP port.
    async fn open(&self, port: u16) -> Result<()>;

    /// Withdraw a TCP port.
    async fn close(&self, port: u16) -> Result<()>;
}

/// Installs system packages.
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Remember packages to install later.
    async fn queue_install(&self, packages: &[&str]) -> Result<()>;

    /// Install everything queued; returns the names now installed.
    async fn install_queued(&self) -> Result<Vec<String>>;
}

/// Looks up operator-supplied resources such as the registry image.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Local path of the named resource, if one was supplied.
    async fn resource(&self, name: &str) -> Result<Option<PathBuf>>;
}

/// What occupies a path, without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    Symlink,
    File,
}

/// Local filesystem operations.
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// What is at `path`, or `None` if nothing is.
    async fn entry_kind(&self, path: &Path) -> Result<Option<EntryKind>>;

    /// Create `path` (and parents) if absent, then restrict it to its owner.
    async fn create_private_dir(&self, path: &Path) -> Result<()>;

    /// Atomically rename `from` to `to`.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Create a symlink at `link` pointing to `target`.
    async fn symlink(&self, target: &Path, link: &Path) -> Result<()>;

    /// Remove a symlink (not its target).
    async fn remove_link(&self, link: &Path) -> Result<()>;

    /// Write `contents` to `path`, creating parent directories.
    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()>;
}

/// Used and free bytes of the filesystem holding a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceUsage {
    pub used: u64,
    pub free: u64,
}

/// Disk usage queries.
#[async_trait]
pub trait DiskUsage: Send + Sync {
    /// Space usage of the filesystem holding `path`.
    async fn usage(&self, path: &Path) -> Result<SpaceUsage>;
}

/// Archive-preserving directory synchronisation.
///
/// Must be safe to re-run: a second run after a partial one converges on
/// the same result.
#[async_trait]
pub trait TreeSync: Send + Sync {
    /// Make `dest` contain everything in `source`.
    async fn sync(&self, source: &Path, dest: &Path) -> Result<()>;
}

/// Advertises the registry to a reverse proxy.
#[async_trait]
pub trait WebsiteRelation: Send + Sync {
    /// Publish the port the registry listens on.
    async fn configure(&self, port: u16) -> Result<()>;
}

/// Wall clock.
pub trait Clock: Send + Sync {
    /// Seconds since the unix epoch.
    fn unix_seconds(&self) -> i64;
}

/// All collaborators, bundled for injection.
#[derive(Clone)]
pub struct Host {
    pub runtime: Arc<dyn ContainerRuntime>,
    pub daemon: Arc<dyn RuntimeDaemon>,
    pub status: Arc<dyn StatusReporter>,
    pub ports: Arc<dyn PortExposure>,
    pub installer: Arc<dyn PackageInstaller>,
    pub resources: Arc<dyn ResourceProvider>,
    pub fs: Arc<dyn Filesystem>,
    pub disk: Arc<dyn DiskUsage>,
    pub sync: Arc<dyn TreeSync>,
    pub website: Arc<dyn WebsiteRelation>,
    pub clock: Arc<dyn Clock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_and_serde() -> std::result::Result<(), serde_json::Error> {
        assert_eq!(Status::Blocked.to_string(), "blocked");
        assert_eq!(serde_json::to_string(&Status::Maintenance)?, "\"maintenance\"");
        Ok(())
    }
}
