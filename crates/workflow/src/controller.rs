//! Service controller: brings the registry up and down.
//!
//! Only the reaction currently running may drive the controller, and the
//! event bus runs one reaction at a time, so start and stop never race.

use tracing::{info, warn};

use crate::deployment::Deployment;
use crate::error::{Error, Result};
use crate::ports::Status;

pub const READY: &str = "Docker registry ready.";
pub const STOPPED: &str = "Docker registry stopped.";

pub struct ServiceController<'a> {
    deployment: &'a Deployment,
}

impl<'a> ServiceController<'a> {
    pub fn new(deployment: &'a Deployment) -> Self {
        Self { deployment }
    }

    /// Bring the service up and expose the configured port.
    ///
    /// Starting a running service is a no-op for the runtime. Failures are
    /// reported blocked and not retried.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the port is unusable and
    /// `Error::Transient` if the runtime or port exposure fails.
    pub async fn start(&self) -> Result<()> {
        let deployment = self.deployment;
        let outcome = async {
            let port = deployment.config.port()?;
            deployment
                .host
                .runtime
                .bring_up(&deployment.layout.compose_file)
                .await
                .map_err(|e| Error::transient("start registry", e))?;
            deployment
                .host
                .ports
                .open(port)
                .await
                .map_err(|e| Error::transient("open port", e))?;
            Ok::<_, Error>(port)
        }
        .await;

        match outcome {
            Ok(port) => {
                info!(port, "Registry started");
                deployment.report(Status::Active, READY).await;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Registry failed to start");
                deployment
                    .report(Status::Blocked, &format!("Failed to start docker registry: {err}"))
                    .await;
                Err(err)
            }
        }
    }

    /// Bring the service down and withdraw the port it was exposed on.
    ///
    /// The port closed is the previously configured one, since the current
    /// value may already differ.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transient` if the runtime or port exposure fails.
    pub async fn stop(&self) -> Result<()> {
        let deployment = self.deployment;
        deployment
            .report(Status::Maintenance, "Stopping docker registry.")
            .await;

        let outcome = async {
            deployment
                .host
                .runtime
                .bring_down(&deployment.layout.compose_file)
                .await
                .map_err(|e| Error::transient("stop registry", e))?;
            let port = match deployment.config.previous_port()? {
                Some(port) => port,
                None => deployment.config.port()?,
            };
            deployment
                .host
                .ports
                .close(port)
                .await
                .map_err(|e| Error::transient("close port", e))?;
            Ok::<_, Error>(port)
        }
        .await;

        match outcome {
            Ok(port) => {
                info!(port, "Registry stopped");
                deployment.report(Status::Maintenance, STOPPED).await;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Registry failed to stop");
                deployment
                    .report(Status::Blocked, &format!("Failed to stop docker registry: {err}"))
                    .await;
                Err(err)
            }
        }
    }
}
