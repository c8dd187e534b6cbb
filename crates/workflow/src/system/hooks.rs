//! Adapters over the hook tools of the hosting framework.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use drydock_core::{Result, ResultExt};
use drydock_events::FactStore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::command::run;
use crate::flags::facts;
use crate::ports::{PortExposure, ResourceProvider, Status, StatusReporter, WebsiteRelation};

/// Last status published, as recorded in the fact store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: Status,
    pub message: String,
    pub at: String,
}

/// Logs the status, records it under the `status` fact and forwards it to
/// the framework's status tool when one is configured.
pub struct HookStatusReporter {
    command: Option<String>,
    store: Arc<dyn FactStore>,
}

impl HookStatusReporter {
    pub fn new(command: Option<String>, store: Arc<dyn FactStore>) -> Self {
        Self { command, store }
    }
}

#[async_trait]
impl StatusReporter for HookStatusReporter {
    async fn report(&self, status: Status, message: &str) {
        match status {
            Status::Blocked => warn!(%status, message, "Status"),
            _ => info!(%status, message, "Status"),
        }

        let record = StatusRecord {
            status,
            message: message.to_string(),
            at: Utc::now().to_rfc3339(),
        };
        if let Some(raw) = serde_json::to_string(&record).into_option_logged() {
            let _ = self.store.set(facts::STATUS, raw).await.into_option_logged();
        }

        if let Some(command) = &self.command {
            let status = status.to_string();
            let _ = run(command, [status.as_str(), message])
                .await
                .into_option_logged();
        }
    }
}

pub struct HookPortExposure {
    open_port: String,
    close_port: String,
}

impl HookPortExposure {
    pub fn new(open_port: impl Into<String>, close_port: impl Into<String>) -> Self {
        Self {
            open_port: open_port.into(),
            close_port: close_port.into(),
        }
    }
}

#[async_trait]
impl PortExposure for HookPortExposure {
    async fn open(&self, port: u16) -> Result<()> {
        run(&self.open_port, [port.to_string()]).await.map(|_| ())
    }

    async fn close(&self, port: u16) -> Result<()> {
        run(&self.close_port, [port.to_string()]).await.map(|_| ())
    }
}

/// Resources supplied by the operator as files in a directory, looked up as
/// `<dir>/<name>` or `<dir>/<name>.tar`.
pub struct DirectoryResources {
    dir: PathBuf,
}

impl DirectoryResources {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ResourceProvider for DirectoryResources {
    async fn resource(&self, name: &str) -> Result<Option<PathBuf>> {
        for candidate in [self.dir.join(name), self.dir.join(format!("{name}.tar"))] {
            if tokio::fs::try_exists(&candidate).await? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

pub struct HookWebsiteRelation {
    relation_set: String,
}

impl HookWebsiteRelation {
    pub fn new(relation_set: impl Into<String>) -> Self {
        Self {
            relation_set: relation_set.into(),
        }
    }
}

#[async_trait]
impl WebsiteRelation for HookWebsiteRelation {
    async fn configure(&self, port: u16) -> Result<()> {
        run(&self.relation_set, [format!("port={port}")]).await.map(|_| ())
    }
}
