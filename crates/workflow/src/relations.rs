//! Recorders that turn external occurrences into flags, and the website
//! relation.

use std::sync::Arc;

use async_trait::async_trait;
use drydock_events::{Guard, Reaction, ReactionContext, Trigger};
use tracing::{debug, info};

use crate::deployment::Deployment;
use crate::error::Result;
use crate::flags::{RUNTIME_AVAILABLE, WEBSITE_AVAILABLE};

/// Sets the runtime flag once the runtime reports it is usable.
#[derive(Debug, Default)]
pub struct RuntimeRecorder;

impl RuntimeRecorder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Reaction for RuntimeRecorder {
    fn id(&self) -> &str {
        "record-runtime"
    }

    fn guard(&self) -> Guard {
        Guard::new().on("runtime.available")
    }

    async fn run(&self, ctx: &mut ReactionContext<'_>) -> drydock_events::Result<()> {
        ctx.set_flag(RUNTIME_AVAILABLE);
        Ok(())
    }
}

/// Tracks whether a reverse proxy is related.
#[derive(Debug, Default)]
pub struct WebsiteRecorder;

impl WebsiteRecorder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Reaction for WebsiteRecorder {
    fn id(&self) -> &str {
        "record-website"
    }

    fn guard(&self) -> Guard {
        Guard::new().on_any(["website.joined", "website.departed"])
    }

    async fn run(&self, ctx: &mut ReactionContext<'_>) -> drydock_events::Result<()> {
        match ctx.trigger() {
            Trigger::WebsiteJoined => ctx.set_flag(WEBSITE_AVAILABLE),
            Trigger::WebsiteDeparted => ctx.clear_flag(WEBSITE_AVAILABLE),
            other => debug!(trigger = %other, "Ignoring trigger"),
        }
        Ok(())
    }
}

/// Publish the registry port to the related reverse proxy.
///
/// # Errors
///
/// Returns `Error::InvalidConfig` for an unusable port and
/// `Error::Transient` if the relation cannot be updated.
pub async fn configure_website(deployment: &Deployment) -> Result<()> {
    let port = deployment.config.port()?;
    deployment.host.website.configure(port).await?;
    info!(port, "Advertised registry to website relation");
    Ok(())
}

pub struct WebsiteReaction {
    deployment: Arc<Deployment>,
}

impl WebsiteReaction {
    pub fn new(deployment: Arc<Deployment>) -> Self {
        Self { deployment }
    }
}

#[async_trait]
impl Reaction for WebsiteReaction {
    fn id(&self) -> &str {
        "configure-website"
    }

    fn guard(&self) -> Guard {
        Guard::new().when(WEBSITE_AVAILABLE)
    }

    async fn run(&self, _ctx: &mut ReactionContext<'_>) -> drydock_events::Result<()> {
        Ok(configure_website(&self.deployment).await?)
    }
}
