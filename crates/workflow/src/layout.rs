//! Fixed host locations used by the workflows.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where artifacts, launch specification and data live on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Rendered launch specification.
    pub compose_file: PathBuf,
    /// Data directory of the container runtime before migration.
    pub default_data_dir: PathBuf,
    /// Relative path of the data directory beneath an attached mount.
    pub data_subpath: PathBuf,
    pub tls_cert: PathBuf,
    pub tls_key: PathBuf,
    pub htpasswd: PathBuf,
    pub registry_config: PathBuf,
    /// Named runtime volume holding registry blobs.
    pub registry_volume: String,
    /// Name of the image resource loaded in standalone mode.
    pub image_resource: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            compose_file: PathBuf::from("/var/lib/drydock/docker-registry/docker-compose.yml"),
            default_data_dir: PathBuf::from("/var/lib/docker"),
            data_subpath: PathBuf::from("var/lib/docker"),
            tls_cert: PathBuf::from("/etc/ssl/certs/docker-registry.crt"),
            tls_key: PathBuf::from("/etc/ssl/private/docker-registry.key"),
            htpasswd: PathBuf::from("/usr/local/etc/htpasswd"),
            registry_config: PathBuf::from("/usr/local/etc/registry.yaml"),
            registry_volume: "registry".to_string(),
            image_resource: "registry".to_string(),
        }
    }
}

impl Layout {
    /// Data directory beneath an attached mount.
    pub fn data_path_under(&self, mount: &Path) -> PathBuf {
        mount.join(&self.data_subpath)
    }

    /// Place the data directory is moved to during cutover.
    pub fn backup_path(&self, unix_seconds: i64) -> PathBuf {
        suffixed(&self.default_data_dir, &unix_seconds.to_string())
    }

    /// Symlink pre-staged next to the data directory before cutover.
    pub fn staged_link(&self) -> PathBuf {
        suffixed(&self.default_data_dir, "drydock-link")
    }
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push("-");
    name.push(suffix);
    PathBuf::from(name)
}
