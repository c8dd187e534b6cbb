//! Core vocabulary: flags, flag sets, mutations and triggers.

use std::fmt;
use std::path::PathBuf;

use im::OrdSet;
use serde::{Deserialize, Serialize};

/// A named, durable boolean fact.
///
/// Presence in the store means "true"; there is no payload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flag(String);

impl Flag {
    /// Create a flag from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The flag name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Flag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Flag {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Immutable snapshot of the flags that are currently set.
///
/// Cloning is cheap; a pass holds one snapshot for its whole duration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet(OrdSet<Flag>);

impl FlagSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a flag is set.
    pub fn contains(&self, flag: &Flag) -> bool {
        self.0.contains(flag)
    }

    /// Check whether a flag is set, by name.
    pub fn is_set(&self, name: &str) -> bool {
        self.0.contains(&Flag::new(name))
    }

    /// Return a new set with the mutations applied in order.
    pub fn with_mutations(&self, mutations: &[FlagMutation]) -> Self {
        let mut next = self.0.clone();
        for mutation in mutations {
            match mutation {
                FlagMutation::Set(flag) => {
                    next.insert(flag.clone());
                }
                FlagMutation::Clear(flag) => {
                    next.remove(flag);
                }
            }
        }
        Self(next)
    }

    /// Iterate the flags in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.0.iter()
    }

    /// Number of flags set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no flag is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Flag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A buffered change to the flag set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlagMutation {
    /// Set the flag.
    Set(Flag),
    /// Clear the flag.
    Clear(Flag),
}

impl FlagMutation {
    /// The flag this mutation touches.
    pub fn flag(&self) -> &Flag {
        match self {
            Self::Set(flag) | Self::Clear(flag) => flag,
        }
    }
}

/// A discrete external occurrence fed into the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// One or more operator options changed value.
    ConfigChanged { options: Vec<String> },
    /// Durable storage was attached at `mount`.
    StorageAttached { mount: PathBuf },
    /// Durable storage is about to be detached.
    StorageDetaching,
    /// The service is being removed.
    Stop,
    /// The container runtime became usable.
    RuntimeAvailable,
    /// A reverse proxy joined the website relation.
    WebsiteJoined,
    /// The reverse proxy left the website relation.
    WebsiteDeparted,
    /// Periodic re-evaluation.
    Update,
    /// Follow-up pass inside one dispatch; carries no trigger names.
    Reevaluate,
}

impl Trigger {
    /// Names this trigger answers to in guard filters.
    pub fn names(&self) -> Vec<String> {
        match self {
            Self::ConfigChanged { options } => std::iter::once("config.changed".to_string())
                .chain(options.iter().map(|option| format!("config.changed.{option}")))
                .collect(),
            Self::StorageAttached { .. } => vec!["storage.attached".to_string()],
            Self::StorageDetaching => vec!["storage.detaching".to_string()],
            Self::Stop => vec!["stop".to_string()],
            Self::RuntimeAvailable => vec!["runtime.available".to_string()],
            Self::WebsiteJoined => vec!["website.joined".to_string()],
            Self::WebsiteDeparted => vec!["website.departed".to_string()],
            Self::Update => vec!["update".to_string()],
            Self::Reevaluate => Vec::new(),
        }
    }

    /// Check whether the trigger answers to `name`.
    pub fn answers_to(&self, name: &str) -> bool {
        self.names().iter().any(|n| n == name)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reevaluate => f.write_str("reevaluate"),
            other => f.write_str(&other.names().join(",")),
        }
    }
}
