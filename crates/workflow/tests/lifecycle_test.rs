//! End-to-end trigger sequences through the full reaction set.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

mod common;

use common::{Harness, HarnessBuilder, TestResult};
use drydock_events::Trigger;
use drydock_workflow::flags::{
    MIGRATED, RUNNING, RUNTIME_AVAILABLE, STANDALONE_RUNNING, STORAGE_ATTACHED, WEBSITE_AVAILABLE,
};
use drydock_workflow::ports::Status;
use drydock_workflow::standalone::MISSING_IMAGE;
use proptest::prelude::*;

/// GIVEN the full reaction set
/// WHEN the bus is built
/// THEN recorders run before the workflows that depend on their flags
#[tokio::test]
async fn reactions_register_in_dependency_order() -> TestResult {
    let harness = HarnessBuilder::new().build().await?;

    assert_eq!(
        harness.bus.reaction_ids(),
        vec![
            "record-runtime",
            "record-website",
            "stop",
            "storage-attach",
            "storage-detach",
            "reconfigure",
            "standalone-start",
            "install-packages",
            "migrate",
            "configure-website",
        ]
    );
    Ok(())
}

/// GIVEN a fresh host
/// WHEN the runtime becomes available
/// THEN the registry starts standalone from the supplied image
#[tokio::test]
async fn runtime_available_starts_standalone() -> TestResult {
    let harness = HarnessBuilder::new().build().await?;

    let report = harness.dispatch(Trigger::RuntimeAvailable).await?;

    assert_eq!(report.executed(), vec!["record-runtime", "standalone-start"]);
    assert!(harness.is_set(RUNTIME_AVAILABLE).await?);
    assert!(harness.is_set(STANDALONE_RUNNING).await?);
    assert!(harness.is_set(RUNNING).await?);
    let image = harness.root().join(common::IMAGE);
    assert!(harness
        .fakes
        .log
        .contains(&format!("runtime.load_image {}", image.display())));
    assert!(harness.fakes.log.contains("ports.open 5000"));
    assert!(harness.deployment.layout.compose_file.exists());
    Ok(())
}

/// GIVEN no image resource
/// THEN standalone start is blocked and sets nothing
#[tokio::test]
async fn standalone_start_needs_an_image() -> TestResult {
    let harness = HarnessBuilder::new().without_image().build().await?;

    let report = harness.dispatch(Trigger::RuntimeAvailable).await?;

    assert!(report.failed().iter().any(|(id, _)| *id == "standalone-start"));
    assert!(!harness.is_set(STANDALONE_RUNNING).await?);
    assert_eq!(harness.fakes.status.blocked(), vec![MISSING_IMAGE.to_string()]);
    assert_eq!(harness.fakes.log.count("runtime."), 0);
    Ok(())
}

/// GIVEN a runtime that cannot bring the service up
/// THEN the start is reported blocked and the running flags stay clear
#[tokio::test]
async fn start_failure_is_blocked_not_retried() -> TestResult {
    let harness = HarnessBuilder::new().build().await?;
    harness
        .fakes
        .runtime
        .fail_bring_up
        .store(true, std::sync::atomic::Ordering::SeqCst);

    harness.dispatch(Trigger::RuntimeAvailable).await?;

    assert!(!harness.is_set(RUNNING).await?);
    assert_eq!(harness.fakes.log.count("runtime.bring_up"), 1);
    assert_eq!(harness.fakes.status.last().map(|(s, _)| s), Some(Status::Blocked));
    Ok(())
}

/// GIVEN a running registry
/// WHEN the unit stops
/// THEN the service is brought down and its port closed
#[tokio::test]
async fn stop_brings_service_down() -> TestResult {
    let harness = HarnessBuilder::new()
        .flags(&[RUNTIME_AVAILABLE, STANDALONE_RUNNING, RUNNING])
        .build()
        .await?;

    harness.dispatch(Trigger::Stop).await?;

    assert_eq!(
        harness.fakes.log.entries(),
        vec!["runtime.bring_down".to_string(), "ports.close 5000".to_string()]
    );
    assert!(harness
        .fakes
        .status
        .saw(Status::Maintenance, "Docker registry stopped."));
    Ok(())
}

/// GIVEN a related reverse proxy
/// THEN the registry port is advertised, and withdrawn flags stop it
#[tokio::test]
async fn website_relation_is_tracked() -> TestResult {
    let harness = HarnessBuilder::new()
        .flags(&[RUNTIME_AVAILABLE, STANDALONE_RUNNING, RUNNING])
        .build()
        .await?;

    harness.dispatch(Trigger::WebsiteJoined).await?;
    assert!(harness.is_set(WEBSITE_AVAILABLE).await?);
    assert!(harness.fakes.log.contains("website.configure 5000"));

    harness.dispatch(Trigger::WebsiteDeparted).await?;
    assert!(!harness.is_set(WEBSITE_AVAILABLE).await?);
    Ok(())
}

/// GIVEN a registry started standalone
/// WHEN storage with room attaches
/// THEN attach, rsync install and migration chain through one dispatch;
/// repeating attach and runtime-available afterwards does nothing more
#[tokio::test]
async fn attach_then_migrate_end_to_end() -> TestResult {
    let harness = HarnessBuilder::new().build().await?;
    harness.seed_data()?;
    harness.dispatch(Trigger::RuntimeAvailable).await?;
    assert!(harness.is_set(STANDALONE_RUNNING).await?);

    let mount = harness.mount();
    harness.fakes.disk.set(harness.data_dir(), 100, 0);
    harness.fakes.disk.set(&mount, 0, 1000);

    let report = harness.attach(&mount).await?;

    assert_eq!(
        report.executed(),
        vec!["storage-attach", "install-packages", "migrate"]
    );
    assert!(harness.is_set(STORAGE_ATTACHED).await?);
    assert!(harness.is_set(MIGRATED).await?);
    assert_eq!(
        std::fs::read_link(harness.data_dir())?,
        harness.new_data_dir()
    );
    assert_eq!(harness.fakes.log.count("sync "), 1);

    // The data directory is now a link into the mount: both report the
    // mount's usage, which is more than half full.
    harness.fakes.disk.set(harness.data_dir(), 600, 400);
    harness.fakes.disk.set(&mount, 600, 400);
    harness.fakes.log.clear();
    let again = harness.attach(&mount).await?;
    harness.dispatch(Trigger::RuntimeAvailable).await?;

    assert!(!again.ran("migrate"));
    assert!(again.failed().is_empty(), "failures: {:?}", again.failed());
    assert!(harness.fakes.status.blocked().is_empty());
    let log = harness.fakes.log.entries();
    assert!(log
        .iter()
        .all(|call| call.starts_with("installer.")), "unexpected calls: {log:?}");
    assert!(harness.is_set(MIGRATED).await?);
    Ok(())
}

async fn run_sequence(harness: &Harness, triggers: Vec<Trigger>) -> TestResult<bool> {
    let mut migrated = false;
    for trigger in triggers {
        harness.dispatch(trigger).await?;
        let now = harness.is_set(MIGRATED).await?;
        if migrated && !now {
            return Ok(false);
        }
        migrated = now;
    }
    Ok(true)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Once set, the migrated flag survives every trigger sequence.
    #[test]
    fn migrated_flag_is_never_cleared(picks in prop::collection::vec(0usize..8, 1..12)) {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let held = runtime.block_on(async {
            let harness = HarnessBuilder::new()
                .previous(&[("registry_port", "5000"), ("registry_tag", "2")])
                .build()
                .await?;
            harness.seed_data()?;
            let mount = harness.mount();

            // Reach the migrated state first, then replay the random tail.
            let mut triggers = vec![
                Trigger::RuntimeAvailable,
                Trigger::StorageAttached { mount: mount.clone() },
            ];
            let choices = [
                Trigger::RuntimeAvailable,
                Trigger::StorageAttached { mount: mount.clone() },
                Trigger::StorageDetaching,
                Trigger::Stop,
                Trigger::Update,
                Trigger::WebsiteJoined,
                Trigger::WebsiteDeparted,
                Trigger::ConfigChanged { options: vec!["registry_port".to_string()] },
            ];
            triggers.extend(picks.iter().filter_map(|i| choices.get(*i).cloned()));
            run_sequence(&harness, triggers).await
        });
        let held = held.map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!(held);
    }
}
