//! Durable fact store on embedded SurrealDB.
//!
//! Scalar facts live in the `fact` table, one record per key. The flag set
//! is a single record in `flagset`, so a batch of mutations is one record
//! write and a reader never observes half of a pass.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surrealdb::engine::local::{Db, Mem, RocksDb};
use surrealdb::Surreal;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{ConnectionError, Error, Result};
use crate::store::FactStore;
use crate::types::{Flag, FlagMutation, FlagSet};

const NAMESPACE: &str = "drydock";
const DATABASE: &str = "facts";
const FACT_TABLE: &str = "fact";
const FLAGSET_TABLE: &str = "flagset";
const FLAGSET_ID: &str = "current";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FactRecord {
    value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FlagRecord {
    flags: Vec<Flag>,
}

/// Fact store persisted in an embedded SurrealDB database.
pub struct SurrealFactStore {
    client: Surreal<Db>,
    /// Serialises read-modify-write of the flag record.
    flag_lock: Mutex<()>,
}

impl SurrealFactStore {
    /// Open (or create) the on-disk store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Locked`] if another process holds the
    /// store, or another connection error if the database cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| ConnectionError::InvalidPath(path.display().to_string()))?;

        tokio::fs::create_dir_all(path).await.map_err(|e| {
            ConnectionError::InitializationFailed {
                reason: format!("cannot create {}: {e}", path.display()),
            }
        })?;

        info!(path = %path.display(), "Opening fact store with kv-rocksdb backend");
        let client = Surreal::new::<RocksDb>(path_str).await.map_err(|e| {
            let message = e.to_string().to_lowercase();
            if message.contains("lock") || message.contains("resource temporarily unavailable") {
                ConnectionError::Locked {
                    path: path.join("LOCK").display().to_string(),
                }
            } else {
                ConnectionError::InitializationFailed {
                    reason: format!("failed to create RocksDb instance: {e}"),
                }
            }
        })?;

        Self::select_database(client).await
    }

    /// Open a volatile store backed by the in-memory engine.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the engine cannot be started.
    pub async fn in_memory() -> Result<Self> {
        let client = Surreal::new::<Mem>(()).await.map_err(|e| {
            ConnectionError::InitializationFailed {
                reason: format!("failed to start in-memory engine: {e}"),
            }
        })?;
        Self::select_database(client).await
    }

    async fn select_database(client: Surreal<Db>) -> Result<Self> {
        client
            .use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| ConnectionError::InitializationFailed {
                reason: format!("failed to select namespace/database: {e}"),
            })?;

        debug!(namespace = NAMESPACE, database = DATABASE, "Fact store ready");
        Ok(Self {
            client,
            flag_lock: Mutex::new(()),
        })
    }

    async fn load_flags(&self) -> Result<FlagRecord> {
        let record: Option<FlagRecord> = self
            .client
            .select((FLAGSET_TABLE, FLAGSET_ID))
            .await
            .map_err(|e| Error::store_failed("flags", e.to_string()))?;
        Ok(record.unwrap_or_default())
    }
}

#[async_trait]
impl FactStore for SurrealFactStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let record: Option<FactRecord> = self
            .client
            .select((FACT_TABLE, key.to_string()))
            .await
            .map_err(|e| Error::store_failed("get", e.to_string()))?;
        Ok(record.map(|r| r.value))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let _: Option<FactRecord> = self
            .client
            .upsert((FACT_TABLE, key.to_string()))
            .content(FactRecord { value })
            .await
            .map_err(|e| Error::store_failed("set", e.to_string()))?;
        Ok(())
    }

    async fn unset(&self, key: &str) -> Result<()> {
        let _: Option<FactRecord> = self
            .client
            .delete((FACT_TABLE, key.to_string()))
            .await
            .map_err(|e| Error::store_failed("unset", e.to_string()))?;
        Ok(())
    }

    async fn flags(&self) -> Result<FlagSet> {
        let record = self.load_flags().await?;
        Ok(record.flags.into_iter().collect())
    }

    async fn apply(&self, mutations: &[FlagMutation]) -> Result<()> {
        if mutations.is_empty() {
            return Ok(());
        }

        let _guard = self.flag_lock.lock().await;
        let current: FlagSet = self.load_flags().await?.flags.into_iter().collect();
        let next = current.with_mutations(mutations);
        let record = FlagRecord {
            flags: next.iter().cloned().collect(),
        };

        let _: Option<FlagRecord> = self
            .client
            .upsert((FLAGSET_TABLE, FLAGSET_ID))
            .content(record)
            .await
            .map_err(|e| Error::store_failed("apply", e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_in_memory_round_trip() -> Result<()> {
        let store = SurrealFactStore::in_memory().await?;
        store
            .set("docker-registry.storage.registry.mount", "/srv/data".to_string())
            .await?;
        assert_eq!(
            store.get("docker-registry.storage.registry.mount").await?,
            Some("/srv/data".to_string())
        );

        store.unset("docker-registry.storage.registry.mount").await?;
        assert_eq!(store.get("docker-registry.storage.registry.mount").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_flags_start_empty_and_apply_in_order() -> Result<()> {
        let store = SurrealFactStore::in_memory().await?;
        assert!(store.flags().await?.is_empty());

        store
            .apply(&[
                FlagMutation::Set(Flag::new("a")),
                FlagMutation::Set(Flag::new("b")),
                FlagMutation::Clear(Flag::new("a")),
            ])
            .await?;

        let flags = store.flags().await?;
        assert!(!flags.is_set("a"));
        assert!(flags.is_set("b"));
        Ok(())
    }

    #[tokio::test]
    async fn test_open_on_disk_creates_directory() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("state").join("facts");

        let store = SurrealFactStore::open(&path).await?;
        store.set("k", "v".to_string()).await?;
        store.apply(&[FlagMutation::Set(Flag::new("migrated"))]).await?;

        assert!(path.is_dir());
        assert_eq!(store.get("k").await?, Some("v".to_string()));
        assert!(store.flags().await?.is_set("migrated"));
        Ok(())
    }

    /// Reopen `path` once the previous handle has released its lock. The
    /// embedded engine shuts down on a background task after the drop.
    async fn reopen(path: &Path) -> Result<SurrealFactStore> {
        let mut attempts = 0;
        loop {
            match SurrealFactStore::open(path).await {
                Err(Error::Connection(ConnectionError::Locked { .. })) if attempts < 50 => {
                    attempts += 1;
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
                other => return other,
            }
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_facts_and_flags_survive_reopen() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("facts");

        {
            let store = SurrealFactStore::open(&path).await?;
            store
                .set("docker-registry.storage.registry.path", "/srv/data/var/lib/docker".to_string())
                .await?;
            store.set("docker-registry.storage.registry.mount", "/srv/data".to_string()).await?;
            store.unset("docker-registry.storage.registry.mount").await?;
            store
                .apply(&[
                    FlagMutation::Set(Flag::new("docker.available")),
                    FlagMutation::Set(Flag::new("docker-registry.storage.docker-registry.migrated")),
                    FlagMutation::Set(Flag::new("apt.queued_installs")),
                    FlagMutation::Clear(Flag::new("apt.queued_installs")),
                ])
                .await?;
        }

        let store = reopen(&path).await?;
        assert_eq!(
            store.get("docker-registry.storage.registry.path").await?,
            Some("/srv/data/var/lib/docker".to_string())
        );
        assert_eq!(store.get("docker-registry.storage.registry.mount").await?, None);
        let flags = store.flags().await?;
        assert!(flags.is_set("docker.available"));
        assert!(flags.is_set("docker-registry.storage.docker-registry.migrated"));
        assert!(!flags.is_set("apt.queued_installs"));
        assert_eq!(flags.len(), 2);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_second_open_while_held_is_locked() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("facts");

        let held = SurrealFactStore::open(&path).await?;
        held.set("k", "v".to_string()).await?;

        let second = SurrealFactStore::open(&path).await;

        assert!(
            matches!(second, Err(Error::Connection(ConnectionError::Locked { .. }))),
            "expected a locked store, got {:?}",
            second.as_ref().err()
        );
        assert_eq!(held.get("k").await?, Some("v".to_string()));
        Ok(())
    }
}
