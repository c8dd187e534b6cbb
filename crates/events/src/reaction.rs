//! Reactions: guarded units of work run by the event bus.

use async_trait::async_trait;

use crate::error::Result;
use crate::guard::Guard;
use crate::store::FactStore;
use crate::types::{Flag, FlagMutation, FlagSet, Trigger};

/// A registered (guard, action) pair.
///
/// The action runs when the guard holds against the pass snapshot. It must
/// isolate its own failures: an `Err` is logged by the bus, the reaction's
/// buffered flag mutations are discarded and the rest of the pass carries
/// on.
#[async_trait]
pub trait Reaction: Send + Sync {
    /// Stable identifier, unique within a bus.
    fn id(&self) -> &str;

    /// Condition under which the reaction may run.
    fn guard(&self) -> Guard;

    /// Run the reaction.
    async fn run(&self, ctx: &mut ReactionContext<'_>) -> Result<()>;
}

/// Everything a reaction may look at or change during a pass.
pub struct ReactionContext<'a> {
    trigger: &'a Trigger,
    snapshot: &'a FlagSet,
    store: &'a dyn FactStore,
    pending: Vec<FlagMutation>,
}

impl<'a> ReactionContext<'a> {
    /// Create a context over a pass snapshot.
    pub fn new(trigger: &'a Trigger, snapshot: &'a FlagSet, store: &'a dyn FactStore) -> Self {
        Self {
            trigger,
            snapshot,
            store,
            pending: Vec::new(),
        }
    }

    /// The trigger that started this pass.
    pub fn trigger(&self) -> &'a Trigger {
        self.trigger
    }

    /// Flags as they were at pass start.
    ///
    /// Mutations buffered by this or earlier reactions in the same pass are
    /// not visible here.
    pub fn flags(&self) -> &FlagSet {
        self.snapshot
    }

    /// Whether `name` was set at pass start.
    pub fn is_set(&self, name: &str) -> bool {
        self.snapshot.is_set(name)
    }

    /// Scalar fact storage. Writes here take effect immediately.
    pub fn facts(&self) -> &'a dyn FactStore {
        self.store
    }

    /// Buffer setting a flag until the pass completes.
    pub fn set_flag(&mut self, flag: impl Into<Flag>) {
        self.pending.push(FlagMutation::Set(flag.into()));
    }

    /// Buffer clearing a flag until the pass completes.
    pub fn clear_flag(&mut self, flag: impl Into<Flag>) {
        self.pending.push(FlagMutation::Clear(flag.into()));
    }

    /// Mutations buffered so far.
    pub fn pending(&self) -> &[FlagMutation] {
        &self.pending
    }

    /// Consume the context, yielding its buffered mutations.
    pub fn into_mutations(self) -> Vec<FlagMutation> {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryFactStore;

    #[tokio::test]
    async fn test_mutations_are_buffered_not_applied() -> Result<()> {
        let store = InMemoryFactStore::new();
        let snapshot = store.flags().await?;
        let trigger = Trigger::Update;

        let mut ctx = ReactionContext::new(&trigger, &snapshot, &store);
        ctx.set_flag("attached");
        assert!(!ctx.is_set("attached"));
        assert_eq!(ctx.pending().len(), 1);

        let mutations = ctx.into_mutations();
        assert_eq!(mutations, vec![FlagMutation::Set(Flag::new("attached"))]);
        assert!(store.flags().await?.is_empty());
        Ok(())
    }
}
