//! Shared fixture: a deployment rooted in a temporary directory, wired to
//! recording fakes and an in-memory fact store.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use drydock_events::{DispatchReport, EventBus, EventBusBuilder, FactStore, InMemoryFactStore, Trigger};
use drydock_workflow::fakes::Fakes;
use drydock_workflow::flags::facts;
use drydock_workflow::{register_reactions, ConfigSnapshot, Deployment, Layout};
use tempfile::TempDir;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub const IMAGE: &str = "registry.tar";

pub struct Harness {
    pub dir: TempDir,
    pub fakes: Fakes,
    pub store: Arc<InMemoryFactStore>,
    pub deployment: Arc<Deployment>,
    pub bus: EventBus,
}

pub fn pairs(values: &[(&str, &str)]) -> BTreeMap<String, String> {
    values
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

pub fn layout_in(root: &Path) -> Layout {
    Layout {
        compose_file: root.join("charm/docker-compose.yml"),
        default_data_dir: root.join("var/lib/docker"),
        tls_cert: root.join("etc/ssl/certs/docker-registry.crt"),
        tls_key: root.join("etc/ssl/private/docker-registry.key"),
        htpasswd: root.join("usr/local/etc/htpasswd"),
        registry_config: root.join("usr/local/etc/registry.yaml"),
        ..Layout::default()
    }
}

pub struct HarnessBuilder {
    current: BTreeMap<String, String>,
    previous: Option<BTreeMap<String, String>>,
    flags: Vec<String>,
    image: bool,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            current: pairs(&[("registry_port", "5000"), ("registry_tag", "2")]),
            previous: None,
            flags: Vec::new(),
            image: true,
        }
    }

    pub fn current(mut self, values: &[(&str, &str)]) -> Self {
        self.current = pairs(values);
        self
    }

    pub fn previous(mut self, values: &[(&str, &str)]) -> Self {
        self.previous = Some(pairs(values));
        self
    }

    pub fn flags(mut self, flags: &[&str]) -> Self {
        self.flags = flags.iter().map(|f| (*f).to_string()).collect();
        self
    }

    pub fn without_image(mut self) -> Self {
        self.image = false;
        self
    }

    pub async fn build(self) -> TestResult<Harness> {
        let dir = tempfile::tempdir()?;
        let fakes = Fakes::new();
        if self.image {
            fakes.resources.attach("registry", dir.path().join(IMAGE));
        }

        let store = Arc::new(InMemoryFactStore::with_flags(self.flags));
        if let Some(previous) = &self.previous {
            store
                .set(facts::CONFIG_PREVIOUS, serde_json::to_string(previous)?)
                .await?;
        }
        let config = ConfigSnapshot::load(store.as_ref(), self.current).await?;

        let deployment = Arc::new(Deployment::new(fakes.host(), layout_in(dir.path()), config));
        let bus = register_reactions(EventBusBuilder::new(), &deployment)
            .with_store(store.clone())
            .build()?;

        Ok(Harness {
            dir,
            fakes,
            store,
            deployment,
            bus,
        })
    }
}

impl Harness {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.deployment.layout.default_data_dir.clone()
    }

    /// Mount point inside the temporary root.
    pub fn mount(&self) -> PathBuf {
        self.root().join("srv/data")
    }

    pub fn new_data_dir(&self) -> PathBuf {
        self.mount().join("var/lib/docker")
    }

    pub async fn dispatch(&self, trigger: Trigger) -> TestResult<DispatchReport> {
        Ok(self.bus.dispatch(trigger).await?)
    }

    pub async fn attach(&self, mount: &Path) -> TestResult<DispatchReport> {
        self.dispatch(Trigger::StorageAttached {
            mount: mount.to_path_buf(),
        })
        .await
    }

    pub async fn is_set(&self, flag: &str) -> TestResult<bool> {
        Ok(self.bus.flags().await?.is_set(flag))
    }

    /// Populate the default data directory with a small tree.
    pub fn seed_data(&self) -> TestResult {
        let data = self.data_dir();
        std::fs::create_dir_all(data.join("volumes/registry/_data"))?;
        std::fs::write(data.join("volumes/registry/_data/blob"), b"layer-bytes")?;
        std::fs::write(data.join("engine-id"), b"abc123")?;
        Ok(())
    }
}

/// Every file under `root` with its contents, relative paths sorted.
pub fn snapshot_tree(root: &Path) -> TestResult<Vec<(PathBuf, Vec<u8>)>> {
    let mut out = Vec::new();
    walk(root, root, &mut out)?;
    out.sort();
    Ok(out)
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<(PathBuf, Vec<u8>)>) -> TestResult {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            walk(root, &path, out)?;
        } else {
            out.push((path.strip_prefix(root)?.to_path_buf(), std::fs::read(&path)?));
        }
    }
    Ok(())
}
