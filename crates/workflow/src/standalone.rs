//! Standalone start and the stop hook.

use std::sync::Arc;

use async_trait::async_trait;
use drydock_events::{Guard, Reaction, ReactionContext};
use tracing::{info, warn};

use crate::deployment::Deployment;
use crate::error::{Error, Result};
use crate::flags::{RUNNING, RUNTIME_AVAILABLE, STANDALONE_RUNNING};
use crate::ports::Status;

pub const MISSING_IMAGE: &str = "Please attach a registry image.";

/// Start the registry from the locally supplied image.
///
/// # Errors
///
/// Returns `Error::MissingResource` if no image was supplied, otherwise
/// whatever loading, rendering or starting the service returns.
pub async fn start_standalone(deployment: &Deployment, ctx: &mut ReactionContext<'_>) -> Result<()> {
    let name = deployment.layout.image_resource.as_str();
    let Some(image) = deployment.host.resources.resource(name).await? else {
        warn!(resource = name, "No registry image attached");
        deployment.report(Status::Blocked, MISSING_IMAGE).await;
        return Err(Error::missing_resource(name));
    };

    info!(image = %image.display(), "Loading registry image");
    if let Err(err) = deployment.host.runtime.load_image(&image).await {
        let err = Error::transient("load registry image", err);
        deployment
            .report(Status::Blocked, &format!("Failed to load registry image: {err}"))
            .await;
        return Err(err);
    }

    if let Err(err) = deployment.render_launch_spec().await {
        deployment.report(Status::Blocked, &err.to_string()).await;
        return Err(err);
    }
    deployment.controller().start().await?;

    ctx.set_flag(STANDALONE_RUNNING);
    ctx.set_flag(RUNNING);
    Ok(())
}

pub struct StandaloneStartReaction {
    deployment: Arc<Deployment>,
}

impl StandaloneStartReaction {
    pub fn new(deployment: Arc<Deployment>) -> Self {
        Self { deployment }
    }
}

#[async_trait]
impl Reaction for StandaloneStartReaction {
    fn id(&self) -> &str {
        "standalone-start"
    }

    fn guard(&self) -> Guard {
        Guard::new()
            .when(RUNTIME_AVAILABLE)
            .when_not(STANDALONE_RUNNING)
    }

    async fn run(&self, ctx: &mut ReactionContext<'_>) -> drydock_events::Result<()> {
        Ok(start_standalone(&self.deployment, ctx).await?)
    }
}

/// Stops the service when the unit is being stopped.
pub struct StopReaction {
    deployment: Arc<Deployment>,
}

impl StopReaction {
    pub fn new(deployment: Arc<Deployment>) -> Self {
        Self { deployment }
    }
}

#[async_trait]
impl Reaction for StopReaction {
    fn id(&self) -> &str {
        "stop"
    }

    fn guard(&self) -> Guard {
        Guard::new().on("stop")
    }

    async fn run(&self, _ctx: &mut ReactionContext<'_>) -> drydock_events::Result<()> {
        Ok(self.deployment.controller().stop().await?)
    }
}
