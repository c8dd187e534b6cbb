//! Storage attachment: mount facts and the capacity gate for migration.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use drydock_events::{Guard, Reaction, ReactionContext, Trigger};
use tracing::{info, warn};

use crate::deployment::Deployment;
use crate::error::{Error, Result};
use crate::flags::{facts, MIGRATED, PACKAGES_QUEUED, RSYNC_PACKAGE, STORAGE_ATTACHED};
use crate::ports::{EntryKind, Status};

pub const NOT_ENOUGH_SPACE: &str = "Not enough free storage space.";

/// Record an attached mount and decide whether migration onto it is
/// feasible.
///
/// The mount facts are recorded either way. The attached flag is only set
/// when the mount can hold the current data directory. Once the data has
/// been migrated there is nothing left to measure and the check is skipped.
///
/// # Errors
///
/// Returns `Error::Capacity` when the data directory does not fit, which is
/// also reported blocked.
pub async fn attach(deployment: &Deployment, ctx: &mut ReactionContext<'_>, mount: &Path) -> Result<()> {
    let data_path = deployment.layout.data_path_under(mount);
    ctx.facts()
        .set(facts::DATA_MOUNT, mount.display().to_string())
        .await?;
    ctx.facts()
        .set(facts::DATA_PATH, data_path.display().to_string())
        .await?;
    info!(mount = %mount.display(), data_path = %data_path.display(), "Registry storage attached");

    let default_dir = &deployment.layout.default_data_dir;
    if holds_local_data(deployment, ctx, default_dir).await? {
        let required = deployment.host.disk.usage(default_dir).await?.used;
        let available = deployment.host.disk.usage(mount).await?.free;
        if required > available {
            warn!(required, available, mount = %mount.display(), "Attached storage too small");
            deployment.report(Status::Blocked, NOT_ENOUGH_SPACE).await;
            return Err(Error::capacity(mount, required, available));
        }
    }

    deployment
        .host
        .installer
        .queue_install(&[RSYNC_PACKAGE])
        .await?;
    ctx.set_flag(PACKAGES_QUEUED);
    ctx.set_flag(STORAGE_ATTACHED);
    Ok(())
}

/// Whether the default data directory still holds data to move. After a
/// cutover it is a link onto the mount.
async fn holds_local_data(deployment: &Deployment, ctx: &ReactionContext<'_>, default_dir: &Path) -> Result<bool> {
    if ctx.is_set(MIGRATED) {
        return Ok(false);
    }
    let kind = deployment.host.fs.entry_kind(default_dir).await?;
    Ok(matches!(kind, Some(kind) if kind != EntryKind::Symlink))
}

/// Forget the mount. A completed migration is left as it is.
///
/// # Errors
///
/// Returns `Error::Store` if the facts cannot be removed.
pub async fn detach(ctx: &mut ReactionContext<'_>) -> Result<()> {
    ctx.facts().unset(facts::DATA_MOUNT).await?;
    ctx.facts().unset(facts::DATA_PATH).await?;
    ctx.clear_flag(STORAGE_ATTACHED);
    info!("Registry storage detached");
    Ok(())
}

pub struct AttachReaction {
    deployment: Arc<Deployment>,
}

impl AttachReaction {
    pub fn new(deployment: Arc<Deployment>) -> Self {
        Self { deployment }
    }
}

#[async_trait]
impl Reaction for AttachReaction {
    fn id(&self) -> &str {
        "storage-attach"
    }

    fn guard(&self) -> Guard {
        Guard::new().on("storage.attached")
    }

    async fn run(&self, ctx: &mut ReactionContext<'_>) -> drydock_events::Result<()> {
        let Trigger::StorageAttached { mount } = ctx.trigger() else {
            return Err(drydock_events::Error::invalid_config(
                "storage attach reaction ran without a mount",
            ));
        };
        Ok(attach(&self.deployment, ctx, mount).await?)
    }
}

#[derive(Debug, Default)]
pub struct DetachReaction;

impl DetachReaction {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Reaction for DetachReaction {
    fn id(&self) -> &str {
        "storage-detach"
    }

    fn guard(&self) -> Guard {
        Guard::new().on("storage.detaching")
    }

    async fn run(&self, ctx: &mut ReactionContext<'_>) -> drydock_events::Result<()> {
        Ok(detach(ctx).await?)
    }
}
