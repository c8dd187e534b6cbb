//! Guard predicates over flags and triggers.

use std::collections::BTreeSet;

use crate::types::{Flag, FlagSet, Trigger};

/// Condition under which a reaction may run.
///
/// A guard holds when every required flag is set, no forbidden flag is set
/// and, if a trigger filter is present, the trigger answers to at least one
/// of the filter names. Guards without a filter are evaluated on every
/// pass, including follow-up passes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Guard {
    required: BTreeSet<Flag>,
    forbidden: BTreeSet<Flag>,
    triggers: Option<BTreeSet<String>>,
}

impl Guard {
    /// A guard that always holds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a flag to be set.
    #[must_use]
    pub fn when(mut self, flag: impl Into<Flag>) -> Self {
        self.required.insert(flag.into());
        self
    }

    /// Require a flag to be absent.
    #[must_use]
    pub fn when_not(mut self, flag: impl Into<Flag>) -> Self {
        self.forbidden.insert(flag.into());
        self
    }

    /// Only fire on triggers answering to `name`. Repeated calls widen the
    /// filter (any-of).
    #[must_use]
    pub fn on(mut self, name: impl Into<String>) -> Self {
        self.triggers
            .get_or_insert_with(BTreeSet::new)
            .insert(name.into());
        self
    }

    /// Only fire on triggers answering to any of `names`.
    #[must_use]
    pub fn on_any<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().fold(self, |guard, name| guard.on(name))
    }

    /// Evaluate the guard against a flag snapshot and the current trigger.
    pub fn holds(&self, flags: &FlagSet, trigger: &Trigger) -> bool {
        self.flags_hold(flags) && self.trigger_matches(trigger)
    }

    /// Evaluate only the flag part of the guard.
    pub fn flags_hold(&self, flags: &FlagSet) -> bool {
        self.required.iter().all(|flag| flags.contains(flag))
            && !self.forbidden.iter().any(|flag| flags.contains(flag))
    }

    fn trigger_matches(&self, trigger: &Trigger) -> bool {
        match &self.triggers {
            None => true,
            Some(names) => trigger.names().iter().any(|name| names.contains(name)),
        }
    }

    /// Flags that must be set.
    pub fn required(&self) -> impl Iterator<Item = &Flag> {
        self.required.iter()
    }

    /// Flags that must be absent.
    pub fn forbidden(&self) -> impl Iterator<Item = &Flag> {
        self.forbidden.iter()
    }
}
