//! Application wiring: fact store, host collaborators, reactions and the
//! event bus, for one hook invocation.

use std::sync::Arc;

use anyhow::{Context, Result};
use drydock_events::{
    DispatchReport, EventBus, EventBusBuilder, FactStore, FlagSet, SurrealFactStore,
    TracingFactStore, Trigger,
};
use drydock_workflow::flags::facts;
use drydock_workflow::system::{self, StatusRecord};
use drydock_workflow::{register_reactions, ConfigSnapshot, Deployment, Host};
use tracing::{info, warn};

use crate::settings::Settings;

pub struct App {
    store: Arc<dyn FactStore>,
    deployment: Arc<Deployment>,
    bus: EventBus,
}

impl App {
    /// Open the durable fact store under the state directory and wire the
    /// host collaborators.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be opened (including when another drydock
    /// process holds it) or the bus cannot be built.
    pub async fn open(settings: &Settings) -> Result<Self> {
        let path = settings.store_path();
        let store = SurrealFactStore::open(&path)
            .await
            .with_context(|| format!("Failed to open fact store at {}", path.display()))?;
        let store: Arc<dyn FactStore> = Arc::new(TracingFactStore::new(store));
        let host = system::host(
            &settings.commands,
            Arc::clone(&store),
            settings.resources_dir.clone(),
            Some((settings.data_owner.uid, settings.data_owner.gid)),
        );
        Self::with_parts(settings, store, host).await
    }

    /// Wire an application over an existing store and host.
    ///
    /// # Errors
    ///
    /// Fails if the configuration snapshot cannot be loaded or the bus
    /// cannot be built.
    pub async fn with_parts(settings: &Settings, store: Arc<dyn FactStore>, host: Host) -> Result<Self> {
        let config = ConfigSnapshot::load(store.as_ref(), settings.options.clone())
            .await
            .context("Failed to load configuration snapshot")?;
        let deployment = Arc::new(Deployment::new(host, settings.layout.clone(), config));
        let bus = register_reactions(EventBusBuilder::new(), &deployment)
            .with_store(Arc::clone(&store))
            .with_max_passes(settings.max_passes)
            .build()
            .context("Failed to build event bus")?;
        Ok(Self {
            store,
            deployment,
            bus,
        })
    }

    /// Trigger for a configuration change: the options that differ from the
    /// last completed invocation.
    pub fn config_changed(&self) -> Trigger {
        Trigger::ConfigChanged {
            options: self
                .deployment
                .config
                .changed()
                .into_iter()
                .map(|option| option.key().to_string())
                .collect(),
        }
    }

    /// Dispatch `trigger`, then record the current options as the previous
    /// ones for the next invocation.
    ///
    /// Reaction failures are reported through the status channel and listed
    /// in the report; only store failures are returned as errors.
    ///
    /// # Errors
    ///
    /// Fails if the fact store fails during dispatch or commit.
    pub async fn dispatch(&self, trigger: Trigger) -> Result<DispatchReport> {
        let report = self
            .bus
            .dispatch(trigger.clone())
            .await
            .with_context(|| format!("Dispatch of '{trigger}' failed"))?;
        self.deployment
            .config
            .commit(self.store.as_ref())
            .await
            .context("Failed to record configuration")?;

        for (reaction, reason) in report.failed() {
            warn!(reaction, reason, "Reaction did not complete");
        }
        info!(
            trigger = %trigger,
            passes = report.passes.len(),
            executed = ?report.executed(),
            "Hook handled"
        );
        Ok(report)
    }

    /// Flags currently set.
    ///
    /// # Errors
    ///
    /// Fails if the fact store cannot be read.
    pub async fn flags(&self) -> Result<FlagSet> {
        self.bus.flags().await.context("Failed to read flags")
    }

    /// Last status reported, if any.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be read or the record is corrupt.
    pub async fn status(&self) -> Result<Option<StatusRecord>> {
        let raw = self
            .store
            .get(facts::STATUS)
            .await
            .context("Failed to read status")?;
        raw.map(|raw| serde_json::from_str(&raw).context("Corrupt status record"))
            .transpose()
    }
}
