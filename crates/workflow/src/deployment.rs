//! One registry deployment: its collaborators, paths and configuration.

use std::sync::Arc;

use drydock_events::EventBusBuilder;
use tracing::debug;

use crate::compose::ComposeFile;
use crate::config::ConfigSnapshot;
use crate::controller::ServiceController;
use crate::error::Result;
use crate::layout::Layout;
use crate::migration::MigrationReaction;
use crate::packages::PackageInstallReaction;
use crate::ports::{Host, Status};
use crate::reconfigure::ReconfigureReaction;
use crate::relations::{RuntimeRecorder, WebsiteReaction, WebsiteRecorder};
use crate::standalone::{StandaloneStartReaction, StopReaction};
use crate::storage::{AttachReaction, DetachReaction};

/// Everything a reaction needs to act on the host.
pub struct Deployment {
    pub host: Host,
    pub layout: Layout,
    pub config: ConfigSnapshot,
}

impl Deployment {
    pub fn new(host: Host, layout: Layout, config: ConfigSnapshot) -> Self {
        Self {
            host,
            layout,
            config,
        }
    }

    /// Controller for the registry service.
    pub fn controller(&self) -> ServiceController<'_> {
        ServiceController::new(self)
    }

    /// Publish a status through the host reporter.
    pub async fn report(&self, status: Status, message: &str) {
        self.host.status.report(status, message).await;
    }

    /// Render the launch specification from the current configuration and
    /// write it to its fixed location.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for an unusable configuration and
    /// `Error::Transient` if the file cannot be written.
    pub async fn render_launch_spec(&self) -> Result<()> {
        let yaml = ComposeFile::from_snapshot(&self.layout, &self.config)?.to_yaml()?;
        self.host
            .fs
            .write_file(&self.layout.compose_file, yaml.as_bytes())
            .await?;
        debug!(path = %self.layout.compose_file.display(), "Rendered launch specification");
        Ok(())
    }
}

/// Register every registry reaction on `builder`, in evaluation order.
pub fn register_reactions(builder: EventBusBuilder, deployment: &Arc<Deployment>) -> EventBusBuilder {
    builder
        .register(Arc::new(RuntimeRecorder::new()))
        .register(Arc::new(WebsiteRecorder::new()))
        .register(Arc::new(StopReaction::new(Arc::clone(deployment))))
        .register(Arc::new(AttachReaction::new(Arc::clone(deployment))))
        .register(Arc::new(DetachReaction::new()))
        .register(Arc::new(ReconfigureReaction::new(Arc::clone(deployment))))
        .register(Arc::new(StandaloneStartReaction::new(Arc::clone(deployment))))
        .register(Arc::new(PackageInstallReaction::new(Arc::clone(deployment))))
        .register(Arc::new(MigrationReaction::new(Arc::clone(deployment))))
        .register(Arc::new(WebsiteReaction::new(Arc::clone(deployment))))
}
