//! Collaborators backed by the real host: external tools, the local
//! filesystem and the hook tools of the hosting framework.

mod command;
mod fs;
mod hooks;
mod packages;
mod runtime;

use std::sync::Arc;

use drydock_events::FactStore;
use serde::{Deserialize, Serialize};

use crate::ports::Host;

pub use command::run;
pub use fs::{LocalFilesystem, RsyncTreeSync, VolumeDiskUsage, SystemClock};
pub use hooks::{
    DirectoryResources, HookPortExposure, HookStatusReporter, HookWebsiteRelation, StatusRecord,
};
pub use packages::AptInstaller;
pub use runtime::{ComposeRuntime, SystemdDaemon};

/// Names of the external tools the adapters invoke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Commands {
    pub docker: String,
    pub systemctl: String,
    /// Unit name of the container runtime daemon.
    pub daemon_unit: String,
    pub rsync: String,
    pub apt_get: String,
    pub open_port: String,
    pub close_port: String,
    /// Status tool; when unset the status is only logged and recorded.
    pub status_set: Option<String>,
    pub relation_set: String,
}

impl Default for Commands {
    fn default() -> Self {
        Self {
            docker: "docker".into(),
            systemctl: "systemctl".into(),
            daemon_unit: "docker".into(),
            rsync: "rsync".into(),
            apt_get: "apt-get".into(),
            open_port: "open-port".into(),
            close_port: "close-port".into(),
            status_set: Some("status-set".into()),
            relation_set: "relation-set".into(),
        }
    }
}

/// Wire every port to its host implementation.
pub fn host(
    commands: &Commands,
    store: Arc<dyn FactStore>,
    resources_dir: impl Into<std::path::PathBuf>,
    data_owner: Option<(u32, u32)>,
) -> Host {
    Host {
        runtime: Arc::new(ComposeRuntime::new(commands.docker.clone())),
        daemon: Arc::new(SystemdDaemon::new(
            commands.systemctl.clone(),
            commands.daemon_unit.clone(),
        )),
        status: Arc::new(HookStatusReporter::new(
            commands.status_set.clone(),
            Arc::clone(&store),
        )),
        ports: Arc::new(HookPortExposure::new(
            commands.open_port.clone(),
            commands.close_port.clone(),
        )),
        installer: Arc::new(AptInstaller::new(commands.apt_get.clone(), store)),
        resources: Arc::new(DirectoryResources::new(resources_dir)),
        fs: Arc::new(LocalFilesystem::new(data_owner)),
        disk: Arc::new(VolumeDiskUsage),
        sync: Arc::new(RsyncTreeSync::new(commands.rsync.clone())),
        website: Arc::new(HookWebsiteRelation::new(commands.relation_set.clone())),
        clock: Arc::new(SystemClock),
    }
}
