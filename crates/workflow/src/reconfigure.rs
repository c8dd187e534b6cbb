//! Reconfiguration after operator options change.
//!
//! The reaction only tears the service down and rewrites its artifacts. The
//! restart comes from the standalone start reaction, which becomes eligible
//! again once the running flags are cleared.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use drydock_events::{Guard, Reaction, ReactionContext};
use tracing::{debug, info, warn};

use crate::config::ConfigOption;
use crate::deployment::Deployment;
use crate::error::{Error, Result};
use crate::flags::{RUNNING, STANDALONE_RUNNING};
use crate::ports::Status;

pub const HTPASSWD_NEEDS_TLS: &str = "Registry htpasswd needs TLS for basic-realm security";

/// Apply changed options to the host.
///
/// A first application of values (no previous port or tag) is not a change
/// and does nothing.
///
/// # Errors
///
/// Returns `Error::Policy` when an htpasswd file is supplied without a full
/// TLS pair, leaving flags untouched. Artifact and runtime failures are
/// reported blocked and returned.
pub async fn reconfigure(deployment: &Deployment, ctx: &mut ReactionContext<'_>) -> Result<()> {
    let config = &deployment.config;
    let Some(previous_port) = config.previous_port()? else {
        debug!("No previous registry_port, skipping reconfiguration");
        return Ok(());
    };
    if config.previous(ConfigOption::RegistryTag).is_none() {
        debug!("No previous registry_tag, skipping reconfiguration");
        return Ok(());
    }

    match apply(deployment, previous_port).await {
        Ok(()) => {
            ctx.clear_flag(STANDALONE_RUNNING);
            ctx.clear_flag(RUNNING);
            info!("Registry reconfigured, restart pending");
            deployment
                .report(Status::Maintenance, "Restarting docker registry with new configuration.")
                .await;
            Ok(())
        }
        Err(err) => {
            warn!(error = %err, "Reconfiguration aborted");
            let message = match &err {
                Error::Policy { .. } => HTPASSWD_NEEDS_TLS.to_string(),
                other => other.to_string(),
            };
            deployment.report(Status::Blocked, &message).await;
            Err(err)
        }
    }
}

async fn apply(deployment: &Deployment, previous_port: u16) -> Result<()> {
    let config = &deployment.config;
    let layout = &deployment.layout;

    deployment
        .report(Status::Maintenance, "Re-configuring port bindings.")
        .await;
    deployment
        .host
        .ports
        .close(previous_port)
        .await
        .map_err(|e| Error::transient("close port", e))?;

    let cert = config.current(ConfigOption::RegistryCert);
    let key = config.current(ConfigOption::RegistryKey);
    let tls = match (cert, key) {
        (Some(cert), Some(key)) => {
            deployment
                .report(Status::Maintenance, "Writing TLS files to /etc/ssl.")
                .await;
            write_decoded(deployment, ConfigOption::RegistryCert, cert, &layout.tls_cert).await?;
            write_decoded(deployment, ConfigOption::RegistryKey, key, &layout.tls_key).await?;
            true
        }
        _ => false,
    };

    if let Some(htpasswd) = config.current(ConfigOption::RegistryHtpasswd) {
        if !tls {
            return Err(Error::policy(HTPASSWD_NEEDS_TLS));
        }
        deployment
            .report(Status::Maintenance, "Writing htpasswd to /usr/local/etc.")
            .await;
        write_decoded(deployment, ConfigOption::RegistryHtpasswd, htpasswd, &layout.htpasswd).await?;
    }

    if let Some(registry_config) = config.current(ConfigOption::RegistryConfig) {
        deployment
            .report(Status::Maintenance, "Writing registry config to /usr/local/etc.")
            .await;
        write_decoded(
            deployment,
            ConfigOption::RegistryConfig,
            registry_config,
            &layout.registry_config,
        )
        .await?;
    }

    deployment
        .host
        .runtime
        .bring_down(&layout.compose_file)
        .await
        .map_err(|e| Error::transient("stop registry", e))?;

    deployment
        .report(Status::Maintenance, "Re-generating Docker compose YAML.")
        .await;
    deployment.render_launch_spec().await
}

async fn write_decoded(
    deployment: &Deployment,
    option: ConfigOption,
    encoded: &str,
    path: &Path,
) -> Result<()> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::invalid_config(option.key(), format!("not valid base64: {e}")))?;
    deployment.host.fs.write_file(path, &bytes).await?;
    debug!(option = %option, path = %path.display(), "Wrote configuration artifact");
    Ok(())
}

pub struct ReconfigureReaction {
    deployment: Arc<Deployment>,
}

impl ReconfigureReaction {
    pub fn new(deployment: Arc<Deployment>) -> Self {
        Self { deployment }
    }
}

#[async_trait]
impl Reaction for ReconfigureReaction {
    fn id(&self) -> &str {
        "reconfigure"
    }

    fn guard(&self) -> Guard {
        Guard::new().on_any(ConfigOption::ALL.map(ConfigOption::changed_trigger))
    }

    async fn run(&self, ctx: &mut ReactionContext<'_>) -> drydock_events::Result<()> {
        Ok(reconfigure(&self.deployment, ctx).await?)
    }
}
