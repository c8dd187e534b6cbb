//! Event bus: evaluates reaction guards and runs passes.

use std::collections::HashSet;
use std::sync::Arc;

use itertools::Itertools;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::reaction::{Reaction, ReactionContext};
use crate::store::FactStore;
use crate::types::{FlagMutation, FlagSet, Trigger};

/// Default cap on passes per dispatch.
pub const DEFAULT_MAX_PASSES: usize = 16;

/// Outcome of a single evaluation pass.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    /// Reactions that ran to completion, in execution order.
    pub executed: Vec<String>,
    /// Reactions that ran and failed, with the failure text.
    pub failed: Vec<(String, String)>,
    /// Mutations applied to the store at the end of the pass.
    pub applied: Vec<FlagMutation>,
    /// Whether the flag set differs after the pass.
    pub changed: bool,
}

impl PassReport {
    /// Whether a reaction with `id` ran (successfully or not).
    pub fn ran(&self, id: &str) -> bool {
        self.executed.iter().any(|e| e == id) || self.failed.iter().any(|(f, _)| f == id)
    }
}

/// Outcome of a dispatch (a trigger plus its follow-up passes).
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Per-pass reports, first pass first.
    pub passes: Vec<PassReport>,
    /// Whether the dispatch stopped because of the pass cap.
    pub truncated: bool,
}

impl DispatchReport {
    /// All reactions that completed, across passes.
    pub fn executed(&self) -> Vec<&str> {
        self.passes
            .iter()
            .flat_map(|p| p.executed.iter().map(String::as_str))
            .collect_vec()
    }

    /// All reactions that failed, across passes.
    pub fn failed(&self) -> Vec<(&str, &str)> {
        self.passes
            .iter()
            .flat_map(|p| p.failed.iter().map(|(id, e)| (id.as_str(), e.as_str())))
            .collect_vec()
    }

    /// Whether a reaction with `id` ran in any pass.
    pub fn ran(&self, id: &str) -> bool {
        self.passes.iter().any(|p| p.ran(id))
    }
}

/// Event bus evaluating registered reactions against the fact store.
///
/// Passes are serialised: one trigger's passes run to completion before the
/// next trigger is accepted.
pub struct EventBus {
    /// Flag and fact storage.
    store: Arc<dyn FactStore>,
    /// Reactions in registration order.
    reactions: Vec<Arc<dyn Reaction>>,
    /// Held for the duration of a pass or dispatch.
    serial: Mutex<()>,
    /// Cap on passes per dispatch.
    max_passes: usize,
}

impl EventBus {
    /// Create a new event bus with the given store and no reactions.
    pub fn new(store: Arc<dyn FactStore>) -> Self {
        Self {
            store,
            reactions: Vec::new(),
            serial: Mutex::new(()),
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    /// Run exactly one evaluation pass for `trigger`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the fact store fails; reaction failures
    /// are reported in the [`PassReport`].
    pub async fn react(&self, trigger: &Trigger) -> Result<PassReport> {
        let _serial = self.serial.lock().await;
        self.pass(trigger, &HashSet::new()).await
    }

    /// Run passes until the flags settle.
    ///
    /// The first pass sees `trigger`; follow-up passes see
    /// [`Trigger::Reevaluate`]. Each reaction runs at most once per
    /// dispatch.
    ///
    /// # Errors
    ///
    /// Returns an error only when the fact store fails.
    pub async fn dispatch(&self, trigger: Trigger) -> Result<DispatchReport> {
        let _serial = self.serial.lock().await;
        info!(trigger = %trigger, "Dispatching trigger");

        let mut report = DispatchReport::default();
        let mut already_ran: HashSet<String> = HashSet::new();
        let mut current = trigger;

        loop {
            if report.passes.len() >= self.max_passes {
                warn!(
                    max_passes = self.max_passes,
                    "Pass limit reached, remaining reactions wait for the next trigger"
                );
                report.truncated = true;
                break;
            }

            let pass = self.pass(&current, &already_ran).await?;
            already_ran.extend(pass.executed.iter().cloned());
            already_ran.extend(pass.failed.iter().map(|(id, _)| id.clone()));

            let settled = !pass.changed;
            report.passes.push(pass);
            if settled {
                break;
            }
            current = Trigger::Reevaluate;
        }

        debug!(
            passes = report.passes.len(),
            executed = report.executed().len(),
            failed = report.failed().len(),
            "Dispatch complete"
        );
        Ok(report)
    }

    async fn pass(&self, trigger: &Trigger, skip: &HashSet<String>) -> Result<PassReport> {
        let snapshot = self.store.flags().await?;
        let mut report = PassReport::default();
        let mut buffered: Vec<FlagMutation> = Vec::new();

        for reaction in &self.reactions {
            let id = reaction.id();
            if skip.contains(id) || !reaction.guard().holds(&snapshot, trigger) {
                continue;
            }

            debug!(reaction = id, trigger = %trigger, "Running reaction");
            let mut ctx = ReactionContext::new(trigger, &snapshot, self.store.as_ref());
            match reaction.run(&mut ctx).await {
                Ok(()) => {
                    buffered.extend(ctx.into_mutations());
                    report.executed.push(id.to_string());
                }
                Err(e) => {
                    warn!(reaction = id, error = %e, "Reaction failed, discarding its flag changes");
                    report.failed.push((id.to_string(), e.to_string()));
                }
            }
        }

        let after: FlagSet = snapshot.with_mutations(&buffered);
        report.changed = after != snapshot;
        if !buffered.is_empty() {
            self.store.apply(&buffered).await?;
        }
        report.applied = buffered;
        Ok(report)
    }

    /// Current flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the fact store fails.
    pub async fn flags(&self) -> Result<FlagSet> {
        self.store.flags().await
    }

    /// Registered reaction ids, in registration order.
    pub fn reaction_ids(&self) -> Vec<&str> {
        self.reactions.iter().map(|r| r.id()).collect_vec()
    }

    /// Get the underlying fact store.
    pub fn store(&self) -> &Arc<dyn FactStore> {
        &self.store
    }

    /// Get the pass cap.
    pub fn max_passes(&self) -> usize {
        self.max_passes
    }
}

/// Builder for EventBus.
pub struct EventBusBuilder {
    store: Option<Arc<dyn FactStore>>,
    reactions: Vec<Arc<dyn Reaction>>,
    max_passes: usize,
}

impl EventBusBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            store: None,
            reactions: Vec::new(),
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    /// Set the fact store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn FactStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register a reaction. Registration order is execution order.
    #[must_use]
    pub fn register(mut self, reaction: Arc<dyn Reaction>) -> Self {
        self.reactions.push(reaction);
        self
    }

    /// Set the pass cap per dispatch.
    #[must_use]
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Build the event bus.
    ///
    /// # Errors
    ///
    /// Fails without a store, with a zero pass cap, or when two reactions
    /// share an id.
    pub fn build(self) -> Result<EventBus> {
        let store = self
            .store
            .ok_or_else(|| Error::invalid_config("No fact store configured"))?;

        if self.max_passes == 0 {
            return Err(Error::invalid_config("max_passes must be at least 1"));
        }

        if let Some(duplicate) = self.reactions.iter().map(|r| r.id()).duplicates().next() {
            return Err(Error::invalid_config(format!(
                "reaction id '{duplicate}' registered twice"
            )));
        }

        Ok(EventBus {
            store,
            reactions: self.reactions,
            serial: Mutex::new(()),
            max_passes: self.max_passes,
        })
    }
}

impl Default for EventBusBuilder {
    fn default() -> Self {
        Self::new()
    }
}
