//! Package installation through apt, with the queue kept in the fact store.

use std::sync::Arc;

use async_trait::async_trait;
use drydock_core::{Error, Result};
use drydock_events::FactStore;
use itertools::Itertools;
use tracing::info;

use super::command::run;
use crate::flags::facts;
use crate::ports::PackageInstaller;

pub struct AptInstaller {
    apt_get: String,
    store: Arc<dyn FactStore>,
}

impl AptInstaller {
    pub fn new(apt_get: impl Into<String>, store: Arc<dyn FactStore>) -> Self {
        Self {
            apt_get: apt_get.into(),
            store,
        }
    }

    async fn queue(&self) -> Result<Vec<String>> {
        let raw = self
            .store
            .get(facts::PACKAGE_QUEUE)
            .await
            .map_err(|e| Error::invalid_record(e.to_string()))?;
        match raw {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| Error::invalid_record(e.to_string())),
            None => Ok(Vec::new()),
        }
    }

    async fn store_queue(&self, queue: &[String]) -> Result<()> {
        let result = if queue.is_empty() {
            self.store.unset(facts::PACKAGE_QUEUE).await
        } else {
            let raw = serde_json::to_string(queue).map_err(|e| Error::invalid_record(e.to_string()))?;
            self.store.set(facts::PACKAGE_QUEUE, raw).await
        };
        result.map_err(|e| Error::invalid_record(e.to_string()))
    }
}

#[async_trait]
impl PackageInstaller for AptInstaller {
    async fn queue_install(&self, packages: &[&str]) -> Result<()> {
        let queue = self
            .queue()
            .await?
            .into_iter()
            .chain(packages.iter().map(|p| (*p).to_string()))
            .unique()
            .collect_vec();
        self.store_queue(&queue).await
    }

    async fn install_queued(&self) -> Result<Vec<String>> {
        let queue = self.queue().await?;
        if queue.is_empty() {
            return Ok(queue);
        }
        info!(packages = ?queue, "Installing packages");
        let args = ["install", "-y", "--no-install-recommends"]
            .into_iter()
            .map(str::to_string)
            .chain(queue.iter().cloned())
            .collect_vec();
        run(&self.apt_get, args).await?;
        self.store_queue(&[]).await?;
        Ok(queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drydock_events::InMemoryFactStore;

    #[tokio::test]
    async fn test_queue_is_deduplicated_and_installed() -> Result<()> {
        let store = InMemoryFactStore::new_arc();
        let installer = AptInstaller::new("true", store);

        installer.queue_install(&["rsync"]).await?;
        installer.queue_install(&["rsync", "curl"]).await?;
        assert_eq!(installer.queue().await?, vec!["rsync", "curl"]);

        assert_eq!(installer.install_queued().await?, vec!["rsync", "curl"]);
        assert!(installer.queue().await?.is_empty());
        assert!(installer.install_queued().await?.is_empty());
        Ok(())
    }
}
