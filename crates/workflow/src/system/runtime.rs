//! Container runtime via `docker compose`, daemon control via systemd.

use std::ffi::OsStr;
use std::path::Path;

use async_trait::async_trait;
use drydock_core::Result;

use super::command::run;
use crate::ports::{ContainerRuntime, RuntimeDaemon};

pub struct ComposeRuntime {
    docker: String,
}

impl ComposeRuntime {
    pub fn new(docker: impl Into<String>) -> Self {
        Self {
            docker: docker.into(),
        }
    }

    async fn compose(&self, launch_spec: &Path, action: &[&str]) -> Result<()> {
        let mut args: Vec<&OsStr> = vec![
            OsStr::new("compose"),
            OsStr::new("-f"),
            launch_spec.as_os_str(),
        ];
        args.extend(action.iter().map(OsStr::new));
        run(&self.docker, args).await.map(|_| ())
    }
}

#[async_trait]
impl ContainerRuntime for ComposeRuntime {
    async fn bring_up(&self, launch_spec: &Path) -> Result<()> {
        self.compose(launch_spec, &["up", "-d"]).await
    }

    async fn bring_down(&self, launch_spec: &Path) -> Result<()> {
        self.compose(launch_spec, &["down"]).await
    }

    async fn load_image(&self, image: &Path) -> Result<()> {
        run(&self.docker, [OsStr::new("load"), OsStr::new("-i"), image.as_os_str()])
            .await
            .map(|_| ())
    }
}

pub struct SystemdDaemon {
    systemctl: String,
    unit: String,
}

impl SystemdDaemon {
    pub fn new(systemctl: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            systemctl: systemctl.into(),
            unit: unit.into(),
        }
    }
}

#[async_trait]
impl RuntimeDaemon for SystemdDaemon {
    async fn stop(&self) -> Result<()> {
        run(&self.systemctl, ["stop", self.unit.as_str()]).await.map(|_| ())
    }

    async fn start(&self) -> Result<()> {
        run(&self.systemctl, ["start", self.unit.as_str()]).await.map(|_| ())
    }
}
