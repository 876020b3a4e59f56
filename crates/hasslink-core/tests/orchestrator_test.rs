// Sync worker scenarios against a scripted API, on paused time.
#![allow(clippy::unwrap_used)]

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use hasslink_api::{Service, SwitchAction};
use hasslink_core::{DeviceState, LinkState, Orchestrator, SensorSpec, SyncStatus};
use pretty_assertions::assert_eq;
use tokio::time::sleep;

use common::{FakeApi, rig, shared, three_switches};

fn statuses(handle: &hasslink_core::SyncHandle) -> Vec<SyncStatus> {
    handle.summaries().iter().map(|s| s.sync_status).collect()
}

#[tokio::test(start_paused = true)]
async fn bulk_fetch_drives_indicators_and_status() {
    let api = shared(&[("switch.a", "on"), ("switch.b", "off"), ("switch.c", "on")]);
    let rig = rig();
    let worker = Orchestrator::spawn(FakeApi::new(&api), &three_switches(), &rig.bridges);

    worker.handle.request_init().unwrap();
    sleep(Duration::from_millis(100)).await;

    let indicators: Vec<Option<bool>> = ["a", "b", "c"].iter().map(|k| rig.ui.indicator(k)).collect();
    assert_eq!(indicators, vec![Some(true), Some(false), Some(true)]);
    assert_eq!(statuses(&worker.handle), vec![SyncStatus::Synced; 3]);
    assert_eq!(worker.handle.link_state(), LinkState::Connected);

    let s = api.lock().unwrap();
    assert_eq!(s.inits, 1);
    assert_eq!(s.bulk_reads, 1);
    assert!(s.single_reads.is_empty());
    drop(s);

    // init + bulk, each bracketed by two feeds
    assert_eq!(rig.watchdog.count(), 4);
}

#[tokio::test(start_paused = true)]
async fn one_failing_device_is_disabled_alone() {
    let api = shared(&[("switch.a", "on"), ("switch.b", "off"), ("switch.c", "on")]);
    {
        let mut s = api.lock().unwrap();
        s.hidden_from_bulk.insert("switch.b".into());
        s.failing_reads.insert("switch.b".into());
    }
    let rig = rig();
    let worker = Orchestrator::spawn(FakeApi::new(&api), &three_switches(), &rig.bridges);
    worker.handle.request_init().unwrap();

    // immediate sync + two timed cycles
    sleep(Duration::from_secs(61)).await;

    let b = worker.handle.summary("b").unwrap();
    assert_eq!(b.failed_attempts, 3);
    assert!(!b.is_enabled);
    assert_eq!(b.sync_status, SyncStatus::Disabled);
    for key in ["a", "c"] {
        let s = worker.handle.summary(key).unwrap();
        assert_eq!(s.failed_attempts, 0);
        assert_eq!(s.sync_status, SyncStatus::Synced);
    }
    assert_eq!(rig.ui.indicator("b"), None);
    assert_eq!(api.lock().unwrap().single_reads.len(), 3);

    // Disabled: excluded from later cycles entirely.
    sleep(Duration::from_secs(60)).await;
    let s = api.lock().unwrap();
    assert_eq!(s.single_reads.len(), 3);
    assert_eq!(worker.handle.summary("b").unwrap().failed_attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn disabled_device_gets_no_service_call() {
    let api = shared(&[("switch.a", "off"), ("switch.b", "off"), ("switch.c", "off")]);
    let rig = rig();
    let worker = Orchestrator::spawn(FakeApi::new(&api), &three_switches(), &rig.bridges);
    worker.handle.request_init().unwrap();
    sleep(Duration::from_secs(2)).await;

    worker.handle.set_enabled("a", false).unwrap();
    sleep(Duration::from_millis(10)).await;
    worker.handle.set_local_intent("a", DeviceState::On).unwrap();

    sleep(Duration::from_secs(65)).await;

    assert!(api.lock().unwrap().calls.is_empty());
    assert_eq!(rig.ui.indicator("a"), Some(false));
    assert_eq!(
        worker.handle.summary("a").unwrap().sync_status,
        SyncStatus::Disabled
    );
}

#[tokio::test(start_paused = true)]
async fn toggle_on_disabled_device_leaves_link_state_alone() {
    let api = shared(&[("switch.a", "off"), ("switch.b", "off"), ("switch.c", "off")]);
    let rig = rig();
    let worker = Orchestrator::spawn(FakeApi::new(&api), &three_switches(), &rig.bridges);
    worker.handle.request_init().unwrap();
    sleep(Duration::from_secs(2)).await;

    worker.handle.set_enabled("a", false).unwrap();
    sleep(Duration::from_millis(10)).await;
    rig.ui.set_toggle("a", true);
    worker.handle.push_intent("a").unwrap();
    sleep(Duration::from_secs(1)).await;

    assert!(api.lock().unwrap().calls.is_empty());
    assert_eq!(worker.handle.link_state(), LinkState::Connected);
    assert!(!rig.ui.statuses.lock().unwrap().contains(&LinkState::SyncError));
    assert_eq!(
        rig.ui.device_status.lock().unwrap().get("a").copied(),
        Some(SyncStatus::Disabled)
    );
}

#[tokio::test(start_paused = true)]
async fn ui_toggle_is_pushed_and_verified() {
    let api = shared(&[("switch.a", "off"), ("switch.b", "off"), ("switch.c", "off")]);
    api.lock().unwrap().apply_calls = true;
    let rig = rig();
    let worker = Orchestrator::spawn(FakeApi::new(&api), &three_switches(), &rig.bridges);
    worker.handle.request_init().unwrap();
    sleep(Duration::from_secs(2)).await;

    rig.ui.set_toggle("a", true);
    worker.handle.push_intent("a").unwrap();
    sleep(Duration::from_secs(1)).await;

    let calls = api.lock().unwrap().calls.clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].service, Service::Switch(SwitchAction::TurnOn));
    assert_eq!(calls[0].entity_id, "switch.a");

    let a = worker.handle.summary("a").unwrap();
    assert_eq!(a.local_intent, DeviceState::On);
    assert_eq!(a.sync_status, SyncStatus::Synced);
    assert!(!a.intent_pending);
    assert_eq!(rig.ui.indicator("a"), Some(true));
}

#[tokio::test(start_paused = true)]
async fn intent_set_during_a_slow_poll_is_kept_and_pushed() {
    let api = shared(&[("switch.a", "off"), ("switch.b", "off"), ("switch.c", "off")]);
    {
        let mut s = api.lock().unwrap();
        s.apply_calls = true;
        s.bulk_delay = Some(Duration::from_secs(5));
    }
    let rig = rig();
    let worker = Orchestrator::spawn(FakeApi::new(&api), &three_switches(), &rig.bridges);
    worker.handle.request_init().unwrap();

    // The initial bulk read is still in flight; it will report "off".
    sleep(Duration::from_secs(1)).await;
    assert_eq!(api.lock().unwrap().bulk_reads, 1);
    worker
        .handle
        .set_local_intent("a", DeviceState::On)
        .unwrap();

    sleep(Duration::from_secs(10)).await;

    let a = worker.handle.summary("a").unwrap();
    assert_eq!(a.local_intent, DeviceState::On);
    assert_eq!(a.remote_state, DeviceState::On);
    assert_eq!(a.sync_status, SyncStatus::Synced);
    assert!(!a.intent_pending);

    let calls = api.lock().unwrap().calls.clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].service, Service::Switch(SwitchAction::TurnOn));
    assert_eq!(calls[0].entity_id, "switch.a");
    assert_eq!(rig.ui.indicator("a"), Some(true));
}

#[tokio::test(start_paused = true)]
async fn push_that_does_not_stick_is_out_of_sync_and_retried() {
    let api = shared(&[("switch.a", "off"), ("switch.b", "off"), ("switch.c", "off")]);
    let rig = rig();
    let worker = Orchestrator::spawn(FakeApi::new(&api), &three_switches(), &rig.bridges);
    worker.handle.request_init().unwrap();
    sleep(Duration::from_secs(2)).await;

    rig.ui.set_toggle("a", true);
    worker.handle.push_intent("a").unwrap();
    sleep(Duration::from_secs(1)).await;

    let a = worker.handle.summary("a").unwrap();
    assert_eq!(a.sync_status, SyncStatus::OutOfSync);
    assert_eq!(a.failed_attempts, 0);
    assert_eq!(a.local_intent, DeviceState::On);

    // Next cycle pushes the pending intent again.
    sleep(Duration::from_secs(30)).await;
    assert_eq!(api.lock().unwrap().calls.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn remote_changes_are_followed() {
    let api = shared(&[("switch.a", "on"), ("switch.b", "off"), ("switch.c", "off")]);
    let rig = rig();
    let worker = Orchestrator::spawn(FakeApi::new(&api), &three_switches(), &rig.bridges);
    worker.handle.request_init().unwrap();
    sleep(Duration::from_secs(2)).await;
    assert_eq!(worker.handle.summary("a").unwrap().local_intent, DeviceState::On);

    api.lock()
        .unwrap()
        .remote
        .insert("switch.a".into(), "off".into());
    sleep(Duration::from_secs(30)).await;

    let a = worker.handle.summary("a").unwrap();
    assert_eq!(a.local_intent, DeviceState::Off);
    assert_eq!(a.sync_status, SyncStatus::Synced);
    assert_eq!(rig.ui.indicator("a"), Some(false));
    assert!(api.lock().unwrap().calls.is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_bulk_falls_back_to_single_reads() {
    let api = shared(&[("switch.a", "on"), ("switch.b", "on"), ("switch.c", "off")]);
    api.lock().unwrap().bulk_fails = true;
    let rig = rig();
    let worker = Orchestrator::spawn(FakeApi::new(&api), &three_switches(), &rig.bridges);
    worker.handle.request_init().unwrap();
    sleep(Duration::from_secs(1)).await;

    assert_eq!(
        api.lock().unwrap().single_reads,
        vec!["switch.a", "switch.b", "switch.c"]
    );
    assert_eq!(statuses(&worker.handle), vec![SyncStatus::Synced; 3]);
    assert_eq!(worker.handle.link_state(), LinkState::Connected);
}

#[tokio::test(start_paused = true)]
async fn sensors_are_read_every_other_cycle() {
    let api = shared(&[("switch.a", "on"), ("switch.b", "on"), ("switch.c", "on")]);
    api.lock().unwrap().sensors.insert("sensor.temp".into(), 21.5);
    let mut config = three_switches();
    config.sensors = vec![SensorSpec::new("sensor.temp", "temp")];
    let rig = rig();
    let worker = Orchestrator::spawn(FakeApi::new(&api), &config, &rig.bridges);
    worker.handle.request_init().unwrap();

    sleep(Duration::from_secs(31)).await;
    assert!(rig.ui.sensors.lock().unwrap().is_empty());

    sleep(Duration::from_secs(31)).await;
    assert_eq!(rig.ui.sensors.lock().unwrap().get("temp").copied(), Some(21.5));
}

#[tokio::test(start_paused = true)]
async fn health_is_reported_on_schedule() {
    let api = shared(&[("switch.a", "on"), ("switch.b", "on"), ("switch.c", "on")]);
    let mut config = three_switches();
    config.schedule.health_every = 2;
    let rig = rig();
    let _worker = Orchestrator::spawn(FakeApi::new(&api), &config, &rig.bridges);

    // Runs even before the API is initialized.
    sleep(Duration::from_secs(61)).await;
    assert_eq!(rig.health.snapshots.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn init_failure_is_reported_and_can_be_retried() {
    let api = shared(&[("switch.a", "on"), ("switch.b", "on"), ("switch.c", "on")]);
    api.lock().unwrap().init_fails = true;
    let rig = rig();
    let worker = Orchestrator::spawn(FakeApi::new(&api), &three_switches(), &rig.bridges);

    worker.handle.request_init().unwrap();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(worker.handle.link_state(), LinkState::Failed);
    assert_eq!(rig.ui.last_status(), Some(LinkState::Failed));

    api.lock().unwrap().init_fails = false;
    worker.handle.request_init().unwrap();
    sleep(Duration::from_millis(10)).await;
    assert!(worker.handle.is_initialized());
    assert_eq!(statuses(&worker.handle), vec![SyncStatus::Synced; 3]);
}

#[tokio::test(start_paused = true)]
async fn sync_before_init_does_nothing() {
    let api = shared(&[("switch.a", "on"), ("switch.b", "on"), ("switch.c", "on")]);
    let rig = rig();
    let worker = Orchestrator::spawn(FakeApi::new(&api), &three_switches(), &rig.bridges);

    worker.handle.request_sync().unwrap();
    sleep(Duration::from_secs(31)).await;

    assert_eq!(api.lock().unwrap().bulk_reads, 0);
    assert_eq!(worker.handle.link_state(), LinkState::Ready);
}

#[tokio::test(start_paused = true)]
async fn shutdown_deinitializes_and_goes_offline() {
    let api = shared(&[("switch.a", "on"), ("switch.b", "on"), ("switch.c", "on")]);
    let rig = rig();
    let worker = Orchestrator::spawn(FakeApi::new(&api), &three_switches(), &rig.bridges);
    worker.handle.request_init().unwrap();
    sleep(Duration::from_secs(2)).await;

    let handle = worker.handle.clone();
    worker.shutdown().await;

    assert_eq!(handle.link_state(), LinkState::Offline);
    assert_eq!(rig.ui.last_status(), Some(LinkState::Offline));
    assert_eq!(api.lock().unwrap().deinits, 1);
    assert!(handle.request_sync().is_err());
}

#[tokio::test(start_paused = true)]
async fn shutdown_lands_between_fallback_reads() {
    let api = shared(&[]);
    {
        let mut s = api.lock().unwrap();
        s.bulk_fails = true;
        s.failing_reads.extend(["switch.a", "switch.b", "switch.c"].map(String::from));
    }
    let rig = rig();
    let worker = Orchestrator::spawn(FakeApi::new(&api), &three_switches(), &rig.bridges);
    worker.handle.request_init().unwrap();

    // First fallback read done; the worker is waiting out the gap.
    sleep(Duration::from_millis(50)).await;
    assert_eq!(api.lock().unwrap().single_reads.len(), 1);

    let handle = worker.handle.clone();
    worker.shutdown().await;

    assert_eq!(api.lock().unwrap().single_reads, vec!["switch.a".to_owned()]);
    assert_eq!(handle.link_state(), LinkState::Offline);
    assert_eq!(handle.summary("b").unwrap().failed_attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn invalid_requests_are_rejected_up_front() {
    let api = shared(&[]);
    let rig = rig();
    let worker = Orchestrator::spawn(FakeApi::new(&api), &three_switches(), &rig.bridges);

    assert!(worker.handle.push_intent("nope").is_err());
    assert!(
        worker
            .handle
            .set_local_intent("a", DeviceState::Unavailable)
            .is_err()
    );
    assert_eq!(
        worker.handle.summary("a").unwrap().local_intent,
        DeviceState::Unknown
    );
}
