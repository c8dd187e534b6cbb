//! Installation of queued packages.

use std::sync::Arc;

use async_trait::async_trait;
use drydock_events::{Guard, Reaction, ReactionContext};
use tracing::info;

use crate::deployment::Deployment;
use crate::error::Result;
use crate::flags::{package_installed, PACKAGES_QUEUED};
use crate::ports::Status;

/// Install whatever is queued and flag each installed package.
///
/// # Errors
///
/// Returns `Error::Transient` if the installer fails; the queue flag stays
/// set so the next pass tries again.
pub async fn install_queued(deployment: &Deployment, ctx: &mut ReactionContext<'_>) -> Result<()> {
    let installed = match deployment.host.installer.install_queued().await {
        Ok(installed) => installed,
        Err(err) => {
            deployment
                .report(Status::Blocked, &format!("Package installation failed: {err}"))
                .await;
            return Err(err.into());
        }
    };
    for package in &installed {
        ctx.set_flag(package_installed(package));
    }
    ctx.clear_flag(PACKAGES_QUEUED);
    info!(packages = ?installed, "Installed queued packages");
    Ok(())
}

pub struct PackageInstallReaction {
    deployment: Arc<Deployment>,
}

impl PackageInstallReaction {
    pub fn new(deployment: Arc<Deployment>) -> Self {
        Self { deployment }
    }
}

#[async_trait]
impl Reaction for PackageInstallReaction {
    fn id(&self) -> &str {
        "install-packages"
    }

    fn guard(&self) -> Guard {
        Guard::new().when(PACKAGES_QUEUED)
    }

    async fn run(&self, ctx: &mut ReactionContext<'_>) -> drydock_events::Result<()> {
        Ok(install_queued(&self.deployment, ctx).await?)
    }
}
