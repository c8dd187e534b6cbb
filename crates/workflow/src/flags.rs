//! Flag and fact names shared by the workflows.

/// The container runtime is usable.
pub const RUNTIME_AVAILABLE: &str = "docker.available";

/// The registry was started from the locally loaded image.
pub const STANDALONE_RUNNING: &str = "docker-registry.standalone.running";

/// The registry service is up.
pub const RUNNING: &str = "docker-registry.running";

/// Durable storage is attached and has room for the data directory.
pub const STORAGE_ATTACHED: &str = "docker-registry.storage.docker-registry.attached";

/// The data directory lives on the attached storage.
pub const MIGRATED: &str = "docker-registry.storage.docker-registry.migrated";

/// A reverse proxy is related on the website interface.
pub const WEBSITE_AVAILABLE: &str = "website.available";

/// Packages are waiting to be installed.
pub const PACKAGES_QUEUED: &str = "apt.queued_installs";

/// The archive-synchronising copy tool.
pub const RSYNC_PACKAGE: &str = "rsync";

/// Flag set once `package` is installed.
pub fn package_installed(package: &str) -> String {
    format!("apt.installed.{package}")
}

/// Scalar fact keys.
pub mod facts {
    /// Mount point of the attached storage.
    pub const DATA_MOUNT: &str = "docker-registry.storage.registry.mount";

    /// Data directory on the attached storage.
    pub const DATA_PATH: &str = "docker-registry.storage.registry.path";

    /// Cutover journal written before the data path is swapped.
    pub const CUTOVER_JOURNAL: &str = "docker-registry.storage.registry.cutover";

    /// Operator options as seen by the last completed dispatch.
    pub const CONFIG_PREVIOUS: &str = "config.previous";

    /// Packages queued for installation (JSON list).
    pub const PACKAGE_QUEUE: &str = "apt.queue";

    /// Last reported workload status (JSON).
    pub const STATUS: &str = "status";
}
