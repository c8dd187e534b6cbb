//! Data directory migration onto attached storage.
//!
//! Everything before the cutover is a check or an idempotent action, so a
//! failure there leaves the old data directory untouched and the reaction
//! can simply run again. The cutover itself is journaled: a symlink to the
//! new directory is staged first, then two renames swap it into place. A
//! run that finds a journal rolls the cutover forward instead of copying
//! again.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use drydock_events::{FactStore, Guard, Reaction, ReactionContext};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::deployment::Deployment;
use crate::error::{Error, Result};
use crate::flags::{
    facts, package_installed, MIGRATED, RSYNC_PACKAGE, RUNTIME_AVAILABLE, STANDALONE_RUNNING,
    STORAGE_ATTACHED,
};
use crate::ports::{EntryKind, Status};

/// Intent recorded before the data path is swapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutoverJournal {
    pub old: PathBuf,
    pub new: PathBuf,
    pub backup: PathBuf,
    pub staged_link: PathBuf,
}

impl CutoverJournal {
    /// Journal left by an interrupted migration, if any.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if the store fails or the journal is corrupt.
    pub async fn load(store: &dyn FactStore) -> Result<Option<Self>> {
        match store.get(facts::CUTOVER_JOURNAL).await? {
            Some(raw) => Ok(Some(
                serde_json::from_str(&raw).map_err(drydock_events::Error::from)?,
            )),
            None => Ok(None),
        }
    }

    async fn record(&self, store: &dyn FactStore) -> Result<()> {
        let raw = serde_json::to_string(self).map_err(drydock_events::Error::from)?;
        store.set(facts::CUTOVER_JOURNAL, raw).await?;
        Ok(())
    }

    async fn discard(store: &dyn FactStore) -> Result<()> {
        store.unset(facts::CUTOVER_JOURNAL).await?;
        Ok(())
    }
}

/// Where a journaled cutover stood when it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resumed {
    /// The data path now points at the new directory.
    Completed,
    /// The cutover never started; migrate from scratch.
    Stale,
}

/// Move the runtime's data directory onto the attached storage.
///
/// # Errors
///
/// Every error is also reported blocked:
/// - `Error::Policy` if the target is the data directory itself.
/// - `Error::FatalPrecondition` if the host is in a shape that is not
///   worked around (target occupied by a file, backup path taken).
/// - `Error::Transient` if stopping, copying or cutting over fails.
pub async fn migrate(deployment: &Deployment, ctx: &mut ReactionContext<'_>) -> Result<()> {
    let outcome = run_migration(deployment, ctx).await;
    if let Err(err) = &outcome {
        match err {
            Error::FatalPrecondition { .. } => error!(error = %err, "Migration halted"),
            _ => warn!(error = %err, retryable = err.is_retryable(), "Migration blocked"),
        }
    }
    outcome
}

async fn run_migration(deployment: &Deployment, ctx: &mut ReactionContext<'_>) -> Result<()> {
    let store = ctx.facts();
    let standalone = ctx.is_set(STANDALONE_RUNNING);

    let mut halted = false;
    if let Some(journal) = CutoverJournal::load(store).await? {
        halt(deployment, standalone).await?;
        halted = true;
        if resume_cutover(deployment, store, &journal).await? == Resumed::Completed {
            return finish(deployment, ctx).await;
        }
    }

    let old = deployment.layout.default_data_dir.clone();
    let Some(new) = store.get(facts::DATA_PATH).await?.map(PathBuf::from) else {
        let err = Error::fatal_precondition("attached storage has no recorded data path");
        deployment.report(Status::Blocked, &err.to_string()).await;
        return Err(err);
    };

    if old == new {
        let message = format!("Cannot migrate {} over itself.", old.display());
        deployment.report(Status::Blocked, &message).await;
        return Err(Error::policy(message));
    }

    let backup = deployment
        .layout
        .backup_path(deployment.host.clock.unix_seconds());
    if deployment.host.fs.entry_kind(&backup).await?.is_some() {
        let err = Error::fatal_precondition(format!(
            "backup path {} already exists",
            backup.display()
        ));
        deployment.report(Status::Blocked, &err.to_string()).await;
        return Err(err);
    }

    if !halted {
        halt(deployment, standalone).await?;
    }

    info!(old = %old.display(), new = %new.display(), "Migrating registry data");
    deployment
        .report(
            Status::Maintenance,
            &format!("Migrating data from {} to {}", old.display(), new.display()),
        )
        .await;

    prepare_target(deployment, &new).await?;

    if let Err(err) = deployment.host.sync.sync(&old, &new).await {
        deployment
            .report(
                Status::Blocked,
                &format!(
                    "Failed to sync data from {} to {}",
                    old.display(),
                    new.display()
                ),
            )
            .await;
        return Err(Error::transient("sync data", err));
    }

    let journal = CutoverJournal {
        old,
        new,
        backup,
        staged_link: deployment.layout.staged_link(),
    };
    cut_over(deployment, store, &journal).await?;
    finish(deployment, ctx).await
}

/// Stop the service and the runtime daemon so nothing holds the data
/// directory open.
async fn halt(deployment: &Deployment, standalone: bool) -> Result<()> {
    if standalone {
        deployment.controller().stop().await?;
    }
    if let Err(err) = deployment.host.daemon.stop().await {
        let err = Error::transient("stop container runtime", err);
        deployment.report(Status::Blocked, &err.to_string()).await;
        return Err(err);
    }
    Ok(())
}

async fn prepare_target(deployment: &Deployment, new: &Path) -> Result<()> {
    match deployment.host.fs.entry_kind(new).await? {
        None | Some(EntryKind::Directory) => {}
        Some(_) => {
            let err = Error::fatal_precondition(format!("{} is not a directory", new.display()));
            deployment.report(Status::Blocked, &err.to_string()).await;
            return Err(err);
        }
    }
    if let Err(err) = deployment.host.fs.create_private_dir(new).await {
        let err = Error::transient("prepare data directory", err);
        deployment.report(Status::Blocked, &err.to_string()).await;
        return Err(err);
    }
    Ok(())
}

async fn cut_over(deployment: &Deployment, store: &dyn FactStore, journal: &CutoverJournal) -> Result<()> {
    let fs = &deployment.host.fs;
    journal.record(store).await?;

    let staged = async {
        if fs.entry_kind(&journal.staged_link).await? == Some(EntryKind::Symlink) {
            fs.remove_link(&journal.staged_link).await?;
        }
        fs.symlink(&journal.new, &journal.staged_link).await?;
        fs.rename(&journal.old, &journal.backup).await
    }
    .await;
    if let Err(err) = staged {
        let err = Error::transient("prepare cutover", err);
        deployment.report(Status::Blocked, &err.to_string()).await;
        return Err(err);
    }

    if let Err(err) = fs.rename(&journal.staged_link, &journal.old).await {
        let err = Error::transient("complete cutover", err);
        deployment
            .report(
                Status::Blocked,
                &format!(
                    "Cutover of {} interrupted, data is at {}: {err}",
                    journal.old.display(),
                    journal.backup.display()
                ),
            )
            .await;
        return Err(err);
    }

    CutoverJournal::discard(store).await?;
    info!(old = %journal.old.display(), backup = %journal.backup.display(), "Cutover complete");
    Ok(())
}

async fn resume_cutover(
    deployment: &Deployment,
    store: &dyn FactStore,
    journal: &CutoverJournal,
) -> Result<Resumed> {
    let fs = &deployment.host.fs;
    let old = fs.entry_kind(&journal.old).await?;
    let backup = fs.entry_kind(&journal.backup).await?;
    let staged = fs.entry_kind(&journal.staged_link).await?;

    let resumed = match (old, backup) {
        (Some(EntryKind::Symlink), _) => {
            if staged == Some(EntryKind::Symlink) {
                fs.remove_link(&journal.staged_link).await?;
            }
            Resumed::Completed
        }
        (None, Some(EntryKind::Directory)) => {
            info!(old = %journal.old.display(), "Rolling interrupted cutover forward");
            if staged == Some(EntryKind::Symlink) {
                fs.rename(&journal.staged_link, &journal.old).await?;
            } else {
                fs.symlink(&journal.new, &journal.old).await?;
            }
            Resumed::Completed
        }
        (Some(EntryKind::Directory), None) => {
            warn!(old = %journal.old.display(), "Discarding stale cutover journal");
            if staged == Some(EntryKind::Symlink) {
                fs.remove_link(&journal.staged_link).await?;
            }
            Resumed::Stale
        }
        _ => {
            let err = Error::fatal_precondition(format!(
                "cannot resume cutover: {} and {} are in an unexpected state",
                journal.old.display(),
                journal.backup.display()
            ));
            deployment.report(Status::Blocked, &err.to_string()).await;
            return Err(err);
        }
    };

    CutoverJournal::discard(store).await?;
    Ok(resumed)
}

/// Restart everything and mark the migration done.
///
/// The flag is set even if the restart fails: the data has moved, and
/// copying again would copy through the link.
async fn finish(deployment: &Deployment, ctx: &mut ReactionContext<'_>) -> Result<()> {
    ctx.set_flag(MIGRATED);

    if let Err(err) = deployment.host.daemon.start().await {
        let err = Error::transient("start container runtime", err);
        warn!(error = %err, "Data migrated but runtime did not restart");
        deployment.report(Status::Blocked, &err.to_string()).await;
        return Ok(());
    }
    if let Err(err) = deployment.controller().start().await {
        warn!(error = %err, "Data migrated but registry did not restart");
        return Ok(());
    }
    info!("Registry data migrated");
    Ok(())
}

pub struct MigrationReaction {
    deployment: Arc<Deployment>,
}

impl MigrationReaction {
    pub fn new(deployment: Arc<Deployment>) -> Self {
        Self { deployment }
    }
}

#[async_trait]
impl Reaction for MigrationReaction {
    fn id(&self) -> &str {
        "migrate"
    }

    fn guard(&self) -> Guard {
        Guard::new()
            .when(STORAGE_ATTACHED)
            .when(RUNTIME_AVAILABLE)
            .when(STANDALONE_RUNNING)
            .when(package_installed(RSYNC_PACKAGE))
            .when_not(MIGRATED)
    }

    async fn run(&self, ctx: &mut ReactionContext<'_>) -> drydock_events::Result<()> {
        Ok(migrate(&self.deployment, ctx).await?)
    }
}
