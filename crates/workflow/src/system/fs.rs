//! Local filesystem, disk statistics, rsync and the wall clock.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use drydock_core::{Error, Result};
use tokio::fs;
use tracing::debug;

use super::command::run;
use crate::ports::{Clock, DiskUsage, EntryKind, Filesystem, SpaceUsage, TreeSync};

const PRIVATE_DIR_MODE: u32 = 0o700;

pub struct LocalFilesystem {
    /// Owner (uid, gid) given to directories created for data.
    data_owner: Option<(u32, u32)>,
}

impl LocalFilesystem {
    pub fn new(data_owner: Option<(u32, u32)>) -> Self {
        Self { data_owner }
    }
}

#[async_trait]
impl Filesystem for LocalFilesystem {
    async fn entry_kind(&self, path: &Path) -> Result<Option<EntryKind>> {
        match fs::symlink_metadata(path).await {
            Ok(meta) if meta.file_type().is_symlink() => Ok(Some(EntryKind::Symlink)),
            Ok(meta) if meta.is_dir() => Ok(Some(EntryKind::Directory)),
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::file_read_failed(path, e.to_string())),
        }
    }

    async fn create_private_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| Error::directory_creation_failed(path, e.to_string()))?;
        if let Some((uid, gid)) = self.data_owner {
            std::os::unix::fs::chown(path, Some(uid), Some(gid))
                .map_err(|e| Error::directory_creation_failed(path, e.to_string()))?;
        }
        fs::set_permissions(path, std::fs::Permissions::from_mode(PRIVATE_DIR_MODE))
            .await
            .map_err(|e| Error::directory_creation_failed(path, e.to_string()))
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        debug!(from = %from.display(), to = %to.display(), "Renaming");
        fs::rename(from, to)
            .await
            .map_err(|e| Error::rename_failed(from, to, e.to_string()))
    }

    async fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        fs::symlink(target, link)
            .await
            .map_err(|e| Error::link_failed(link, target, e.to_string()))
    }

    async fn remove_link(&self, link: &Path) -> Result<()> {
        fs::remove_file(link)
            .await
            .map_err(|e| Error::link_failed(link, link, e.to_string()))
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::directory_creation_failed(parent, e.to_string()))?;
        }
        fs::write(path, contents)
            .await
            .map_err(|e| Error::file_write_failed(path, e.to_string()))
    }
}

/// Usage of the volume holding a path, as reported by the filesystem.
pub struct VolumeDiskUsage;

#[async_trait]
impl DiskUsage for VolumeDiskUsage {
    async fn usage(&self, path: &Path) -> Result<SpaceUsage> {
        let failed = |e: std::io::Error| Error::disk_usage_failed(path, e.to_string());
        let total = fs2::total_space(path).map_err(failed)?;
        let free = fs2::free_space(path).map_err(failed)?;
        let available = fs2::available_space(path).map_err(failed)?;
        Ok(SpaceUsage {
            used: total.saturating_sub(free),
            free: available,
        })
    }
}

/// Archive copy with `rsync -a`, safe to re-run.
pub struct RsyncTreeSync {
    rsync: String,
}

impl RsyncTreeSync {
    pub fn new(rsync: impl Into<String>) -> Self {
        Self {
            rsync: rsync.into(),
        }
    }
}

#[async_trait]
impl TreeSync for RsyncTreeSync {
    async fn sync(&self, source: &Path, dest: &Path) -> Result<()> {
        run(&self.rsync, ["-a".to_string(), with_slash(source), with_slash(dest)])
            .await
            .map(|_| ())
    }
}

fn with_slash(path: &Path) -> String {
    format!("{}/", path.display().to_string().trim_end_matches('/'))
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_seconds(&self) -> i64 {
        Utc::now().timestamp()
    }
}
