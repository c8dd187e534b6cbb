//! Recording collaborators for tests.
//!
//! Every fake appends to one shared [`CallLog`], so tests can assert on the
//! relative order of calls across collaborators. The filesystem is the real
//! one: point the [`Layout`](crate::layout::Layout) at a temporary
//! directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use drydock_core::{Error, Result};

use crate::ports::{
    Clock, ContainerRuntime, DiskUsage, Host, PackageInstaller, PortExposure, ResourceProvider,
    RuntimeDaemon, SpaceUsage, Status, StatusReporter, TreeSync, WebsiteRelation,
};
use crate::system::LocalFilesystem;

/// Ordered record of collaborator calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, call: impl Into<String>) {
        if let Ok(mut calls) = self.0.lock() {
            calls.push(call.into());
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn contains(&self, call: &str) -> bool {
        self.entries().iter().any(|entry| entry == call)
    }

    /// Calls starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.entries()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    /// Position of the first call equal to `call`.
    pub fn position(&self, call: &str) -> Option<usize> {
        self.entries().iter().position(|entry| entry == call)
    }

    pub fn clear(&self) {
        if let Ok(mut calls) = self.0.lock() {
            calls.clear();
        }
    }
}

fn failure(call: &str) -> Error {
    Error::command_failed(call, "exit status: 1", "simulated failure")
}

#[derive(Debug, Default)]
pub struct FakeRuntime {
    log: CallLog,
    pub fail_bring_up: AtomicBool,
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn bring_up(&self, _launch_spec: &Path) -> Result<()> {
        self.log.record("runtime.bring_up");
        if self.fail_bring_up.load(Ordering::SeqCst) {
            return Err(failure("docker compose up"));
        }
        Ok(())
    }

    async fn bring_down(&self, _launch_spec: &Path) -> Result<()> {
        self.log.record("runtime.bring_down");
        Ok(())
    }

    async fn load_image(&self, image: &Path) -> Result<()> {
        self.log.record(format!("runtime.load_image {}", image.display()));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FakeDaemon {
    log: CallLog,
    pub fail_start: AtomicBool,
}

#[async_trait]
impl RuntimeDaemon for FakeDaemon {
    async fn stop(&self) -> Result<()> {
        self.log.record("daemon.stop");
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        self.log.record("daemon.start");
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(failure("systemctl start docker"));
        }
        Ok(())
    }
}

/// Keeps every reported status.
#[derive(Debug, Default)]
pub struct RecordingStatus(Mutex<Vec<(Status, String)>>);

impl RecordingStatus {
    pub fn all(&self) -> Vec<(Status, String)> {
        self.0.lock().map(|all| all.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<(Status, String)> {
        self.all().pop()
    }

    /// Whether `message` was ever reported with `status`.
    pub fn saw(&self, status: Status, message: &str) -> bool {
        self.all()
            .iter()
            .any(|(s, m)| *s == status && m == message)
    }

    pub fn blocked(&self) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|(status, _)| *status == Status::Blocked)
            .map(|(_, message)| message)
            .collect()
    }
}

#[async_trait]
impl StatusReporter for RecordingStatus {
    async fn report(&self, status: Status, message: &str) {
        if let Ok(mut all) = self.0.lock() {
            all.push((status, message.to_string()));
        }
    }
}

#[derive(Debug, Default)]
pub struct FakePorts {
    log: CallLog,
}

#[async_trait]
impl PortExposure for FakePorts {
    async fn open(&self, port: u16) -> Result<()> {
        self.log.record(format!("ports.open {port}"));
        Ok(())
    }

    async fn close(&self, port: u16) -> Result<()> {
        self.log.record(format!("ports.close {port}"));
        Ok(())
    }
}

/// Installs instantly; remembers the queue in memory.
#[derive(Debug, Default)]
pub struct FakeInstaller {
    log: CallLog,
    queue: Mutex<Vec<String>>,
}

#[async_trait]
impl PackageInstaller for FakeInstaller {
    async fn queue_install(&self, packages: &[&str]) -> Result<()> {
        self.log.record(format!("installer.queue {}", packages.join(" ")));
        if let Ok(mut queue) = self.queue.lock() {
            queue.extend(packages.iter().map(|p| (*p).to_string()));
        }
        Ok(())
    }

    async fn install_queued(&self) -> Result<Vec<String>> {
        let installed = self
            .queue
            .lock()
            .map(|mut queue| std::mem::take(&mut *queue))
            .unwrap_or_default();
        self.log.record(format!("installer.install {}", installed.join(" ")));
        Ok(installed)
    }
}

#[derive(Debug, Default)]
pub struct FakeResources(Mutex<HashMap<String, PathBuf>>);

impl FakeResources {
    pub fn attach(&self, name: &str, path: impl Into<PathBuf>) {
        if let Ok(mut resources) = self.0.lock() {
            resources.insert(name.to_string(), path.into());
        }
    }
}

#[async_trait]
impl ResourceProvider for FakeResources {
    async fn resource(&self, name: &str) -> Result<Option<PathBuf>> {
        Ok(self
            .0
            .lock()
            .ok()
            .and_then(|resources| resources.get(name).cloned()))
    }
}

/// Disk usage configured per path. Unknown paths are empty with unlimited
/// free space.
#[derive(Debug, Default)]
pub struct FixedDiskUsage(Mutex<HashMap<PathBuf, SpaceUsage>>);

impl FixedDiskUsage {
    pub fn set(&self, path: impl Into<PathBuf>, used: u64, free: u64) {
        if let Ok(mut usage) = self.0.lock() {
            usage.insert(path.into(), SpaceUsage { used, free });
        }
    }
}

#[async_trait]
impl DiskUsage for FixedDiskUsage {
    async fn usage(&self, path: &Path) -> Result<SpaceUsage> {
        Ok(self
            .0
            .lock()
            .ok()
            .and_then(|usage| usage.get(path).copied())
            .unwrap_or(SpaceUsage {
                used: 0,
                free: u64::MAX,
            }))
    }
}

/// In-process recursive copy that can be told to fail.
#[derive(Debug, Default)]
pub struct CopyTreeSync {
    log: CallLog,
    pub fail: AtomicBool,
}

#[async_trait]
impl TreeSync for CopyTreeSync {
    async fn sync(&self, source: &Path, dest: &Path) -> Result<()> {
        self.log
            .record(format!("sync {} {}", source.display(), dest.display()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(failure("rsync"));
        }
        copy_tree(source, dest)
    }
}

fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        let kind = entry.file_type()?;
        if kind.is_symlink() {
            let link = std::fs::read_link(entry.path())?;
            if std::fs::symlink_metadata(&target).is_ok() {
                std::fs::remove_file(&target)?;
            }
            std::os::unix::fs::symlink(link, &target)?;
        } else if kind.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct FakeWebsite {
    log: CallLog,
}

#[async_trait]
impl WebsiteRelation for FakeWebsite {
    async fn configure(&self, port: u16) -> Result<()> {
        self.log.record(format!("website.configure {port}"));
        Ok(())
    }
}

#[derive(Debug)]
pub struct FixedClock(AtomicI64);

impl FixedClock {
    pub fn new(unix_seconds: i64) -> Self {
        Self(AtomicI64::new(unix_seconds))
    }

    pub fn set(&self, unix_seconds: i64) {
        self.0.store(unix_seconds, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn unix_seconds(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// A full set of fakes sharing one call log.
pub struct Fakes {
    pub log: CallLog,
    pub runtime: Arc<FakeRuntime>,
    pub daemon: Arc<FakeDaemon>,
    pub status: Arc<RecordingStatus>,
    pub ports: Arc<FakePorts>,
    pub installer: Arc<FakeInstaller>,
    pub resources: Arc<FakeResources>,
    pub disk: Arc<FixedDiskUsage>,
    pub sync: Arc<CopyTreeSync>,
    pub website: Arc<FakeWebsite>,
    pub clock: Arc<FixedClock>,
}

impl Default for Fakes {
    fn default() -> Self {
        Self::new()
    }
}

impl Fakes {
    pub fn new() -> Self {
        let log = CallLog::default();
        Self {
            runtime: Arc::new(FakeRuntime {
                log: log.clone(),
                fail_bring_up: AtomicBool::new(false),
            }),
            daemon: Arc::new(FakeDaemon {
                log: log.clone(),
                fail_start: AtomicBool::new(false),
            }),
            status: Arc::new(RecordingStatus::default()),
            ports: Arc::new(FakePorts { log: log.clone() }),
            installer: Arc::new(FakeInstaller {
                log: log.clone(),
                queue: Mutex::new(Vec::new()),
            }),
            resources: Arc::new(FakeResources::default()),
            disk: Arc::new(FixedDiskUsage::default()),
            sync: Arc::new(CopyTreeSync {
                log: log.clone(),
                fail: AtomicBool::new(false),
            }),
            website: Arc::new(FakeWebsite { log: log.clone() }),
            clock: Arc::new(FixedClock::new(1_700_000_000)),
            log,
        }
    }

    /// Host wired to these fakes and the real filesystem.
    pub fn host(&self) -> Host {
        Host {
            runtime: self.runtime.clone(),
            daemon: self.daemon.clone(),
            status: self.status.clone(),
            ports: self.ports.clone(),
            installer: self.installer.clone(),
            resources: self.resources.clone(),
            fs: Arc::new(LocalFilesystem::new(None)),
            disk: self.disk.clone(),
            sync: self.sync.clone(),
            website: self.website.clone(),
            clock: self.clock.clone(),
        }
    }
}
