//! Fact store trait and implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::types::{FlagMutation, FlagSet};

/// Durable key-value store for flags and scalar facts.
///
/// Per-key writes are atomic. [`FactStore::apply`] writes a whole batch of
/// flag mutations atomically: a concurrent [`FactStore::flags`] sees either
/// none or all of them.
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Read a scalar fact.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a scalar fact.
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Remove a scalar fact. Removing an absent key is not an error.
    async fn unset(&self, key: &str) -> Result<()>;

    /// Snapshot of the flags currently set.
    async fn flags(&self) -> Result<FlagSet>;

    /// Apply flag mutations in order, atomically.
    async fn apply(&self, mutations: &[FlagMutation]) -> Result<()>;
}

#[derive(Default)]
struct Facts {
    values: HashMap<String, String>,
    flags: FlagSet,
}

/// In-memory fact store for testing.
#[derive(Default)]
pub struct InMemoryFactStore {
    facts: RwLock<Facts>,
}

impl InMemoryFactStore {
    /// Create a new in-memory fact store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new in-memory fact store wrapped in an Arc.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Create a store with the given flags already set.
    pub fn with_flags<I, F>(flags: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<crate::types::Flag>,
    {
        Self {
            facts: RwLock::new(Facts {
                values: HashMap::new(),
                flags: flags.into_iter().map(Into::into).collect(),
            }),
        }
    }
}

#[async_trait]
impl FactStore for InMemoryFactStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.facts.read().await.values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.facts
            .write()
            .await
            .values
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn unset(&self, key: &str) -> Result<()> {
        self.facts.write().await.values.remove(key);
        Ok(())
    }

    async fn flags(&self) -> Result<FlagSet> {
        Ok(self.facts.read().await.flags.clone())
    }

    async fn apply(&self, mutations: &[FlagMutation]) -> Result<()> {
        let mut facts = self.facts.write().await;
        facts.flags = facts.flags.with_mutations(mutations);
        Ok(())
    }
}

/// A wrapper that adds tracing to a fact store.
pub struct TracingFactStore<S: FactStore> {
    inner: S,
}

impl<S: FactStore> TracingFactStore<S> {
    /// Create a new tracing fact store.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: FactStore> FactStore for TracingFactStore<S> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self.inner.get(key).await;
        if let Ok(ref v) = value {
            tracing::trace!(key, present = v.is_some(), "Fact read");
        }
        value
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        tracing::debug!(key, value = %value, "Setting fact");
        self.inner.set(key, value).await
    }

    async fn unset(&self, key: &str) -> Result<()> {
        tracing::debug!(key, "Unsetting fact");
        self.inner.unset(key).await
    }

    async fn flags(&self) -> Result<FlagSet> {
        self.inner.flags().await
    }

    async fn apply(&self, mutations: &[FlagMutation]) -> Result<()> {
        for mutation in mutations {
            match mutation {
                FlagMutation::Set(flag) => tracing::debug!(flag = %flag, "Setting flag"),
                FlagMutation::Clear(flag) => tracing::debug!(flag = %flag, "Clearing flag"),
            }
        }
        self.inner.apply(mutations).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Flag;

    #[tokio::test]
    async fn test_set_get_unset() -> Result<()> {
        let store = InMemoryFactStore::new();
        store.set("mount", "/srv/data".to_string()).await?;
        assert_eq!(store.get("mount").await?, Some("/srv/data".to_string()));

        store.unset("mount").await?;
        assert_eq!(store.get("mount").await?, None);

        // unsetting twice is fine
        store.unset("mount").await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_batch() -> Result<()> {
        let store = InMemoryFactStore::with_flags(["running"]);
        store
            .apply(&[
                FlagMutation::Set(Flag::new("attached")),
                FlagMutation::Clear(Flag::new("running")),
            ])
            .await?;

        let flags = store.flags().await?;
        assert!(flags.is_set("attached"));
        assert!(!flags.is_set("running"));
        Ok(())
    }

    #[tokio::test]
    async fn test_tracing_store_delegates() -> Result<()> {
        let store = TracingFactStore::new(InMemoryFactStore::new());
        store.set("k", "v".to_string()).await?;
        store.apply(&[FlagMutation::Set(Flag::new("f"))]).await?;

        assert_eq!(store.get("k").await?, Some("v".to_string()));
        assert!(store.flags().await?.is_set("f"));
        Ok(())
    }
}
