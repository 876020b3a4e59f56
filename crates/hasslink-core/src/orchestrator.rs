// ── Sync worker ──
//
// One task, one outstanding request at a time. Each iteration drains the
// command queue, serves init / sync-now / pushes in that order, then
// waits for the next command, tick or cancellation.

use std::sync::Arc;

use hasslink_api::{ApiError, EntityState};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::StateApi;
use crate::bridge::{HealthProbe, NoHealthProbe, NoopWatchdog, UiBridge, Watchdog, guarded};
use crate::config::{Schedule, SyncConfig};
use crate::engine::SyncEngine;
use crate::error::SyncError;
use crate::handle::{Command, SyncHandle};
use crate::model::{DeviceState, LinkState, SensorSpec};
use crate::registry::DeviceRegistry;

/// Collaborators handed to every worker.
#[derive(Clone)]
pub struct Bridges {
    pub ui: Arc<dyn UiBridge>,
    pub watchdog: Arc<dyn Watchdog>,
    pub health: Arc<dyn HealthProbe>,
}

impl Bridges {
    pub fn new(ui: Arc<dyn UiBridge>) -> Self {
        Self {
            ui,
            watchdog: Arc::new(NoopWatchdog),
            health: Arc::new(NoHealthProbe),
        }
    }

    pub fn with_watchdog(mut self, watchdog: Arc<dyn Watchdog>) -> Self {
        self.watchdog = watchdog;
        self
    }

    pub fn with_health(mut self, health: Arc<dyn HealthProbe>) -> Self {
        self.health = health;
        self
    }
}

/// A spawned worker: its handle, its stop token and its task.
pub struct Worker {
    pub handle: SyncHandle,
    pub cancel: CancellationToken,
    pub join: JoinHandle<()>,
}

impl Worker {
    /// Cancel and wait for the task to finish its current request.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.handle.stop();
        if let Err(e) = self.join.await {
            warn!(error = %e, "sync worker task ended abnormally");
        }
    }
}

#[derive(Debug, Default)]
struct Pending {
    init: bool,
    sync_now: bool,
    enable: Vec<(String, bool)>,
    pushes: Vec<String>,
    stop: bool,
}

impl Pending {
    fn absorb(&mut self, cmd: Command) {
        match cmd {
            Command::Init => self.init = true,
            Command::SyncNow => self.sync_now = true,
            Command::PushIntent { entity_id } => {
                if !self.pushes.contains(&entity_id) {
                    self.pushes.push(entity_id);
                }
            }
            Command::SetEnabled { entity_id, enabled } => self.enable.push((entity_id, enabled)),
            Command::Stop => self.stop = true,
        }
    }
}

enum Wake {
    Cancelled,
    Command(Option<Command>),
    Tick,
}

/// Outcome of one switch reconciliation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct PassReport {
    observed: usize,
    failed: usize,
    pushed: usize,
}

pub struct Orchestrator<A> {
    engine: SyncEngine<A>,
    ui: Arc<dyn UiBridge>,
    health: Arc<dyn HealthProbe>,
    sensors: Vec<SensorSpec>,
    schedule: Schedule,
    state: watch::Sender<LinkState>,
    rx: mpsc::Receiver<Command>,
    cancel: CancellationToken,
    pending: Pending,
    cycle: u64,
}

impl<A: StateApi> Orchestrator<A> {
    /// Build fresh records for `config` and spawn the worker task.
    pub fn spawn(api: A, config: &SyncConfig, bridges: &Bridges) -> Worker {
        let registry = Arc::new(DeviceRegistry::new(&config.devices));
        let (tx, rx) = mpsc::channel(config.schedule.command_queue.max(1));
        let (state, state_rx) = watch::channel(LinkState::Starting);
        let cancel = CancellationToken::new();

        let handle = SyncHandle::new(tx, Arc::clone(&registry), state_rx);
        let engine = SyncEngine::new(
            api,
            registry,
            config.policy,
            Arc::clone(&bridges.watchdog),
        );
        let worker = Self {
            engine,
            ui: Arc::clone(&bridges.ui),
            health: Arc::clone(&bridges.health),
            sensors: config.sensors.clone(),
            schedule: config.schedule,
            state,
            rx,
            cancel: cancel.clone(),
            pending: Pending::default(),
            cycle: 0,
        };
        bridges.ui.set_status(LinkState::Starting);

        let join = tokio::spawn(worker.run());
        Worker {
            handle,
            cancel,
            join,
        }
    }

    fn publish(&self, state: LinkState) {
        self.state.send_replace(state);
        self.ui.set_status(state);
    }

    async fn run(mut self) {
        info!(devices = self.engine.registry().len(), "sync worker started");
        self.publish(LinkState::Ready);

        let period = self.schedule.sync_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let cancel = self.cancel.clone();

        loop {
            while let Ok(cmd) = self.rx.try_recv() {
                self.pending.absorb(cmd);
            }
            if self.pending.stop || cancel.is_cancelled() {
                break;
            }

            if std::mem::take(&mut self.pending.init) {
                self.handle_init();
                continue;
            }
            if std::mem::take(&mut self.pending.sync_now) {
                self.immediate_sync().await;
                continue;
            }
            if !self.pending.enable.is_empty() {
                for (entity_id, enabled) in std::mem::take(&mut self.pending.enable) {
                    self.apply_enabled(&entity_id, enabled);
                }
                continue;
            }
            if !self.pending.pushes.is_empty() {
                let entity_id = self.pending.pushes.remove(0);
                self.push_intent(&entity_id).await;
                continue;
            }

            let wake = tokio::select! {
                biased;
                () = cancel.cancelled() => Wake::Cancelled,
                cmd = self.rx.recv() => Wake::Command(cmd),
                _ = ticker.tick() => Wake::Tick,
            };
            match wake {
                Wake::Cancelled | Wake::Command(None) => break,
                Wake::Command(Some(cmd)) => self.pending.absorb(cmd),
                Wake::Tick => self.run_cycle().await,
            }
        }

        self.publish(LinkState::Stopping);
        self.engine.api_mut().deinit();
        self.publish(LinkState::Offline);
        info!("sync worker stopped");
    }

    // ── Requests ─────────────────────────────────────────────────────

    fn handle_init(&mut self) {
        if self.engine.api().is_initialized() {
            debug!("init requested but API already initialized");
            return;
        }
        info!("initializing Home Assistant API");
        self.engine.watchdog().feed();
        let result = self.engine.api_mut().init();
        self.engine.watchdog().feed();

        match result {
            Ok(()) => {
                info!("Home Assistant API initialized");
                self.publish(LinkState::Connected);
                self.pending.sync_now = true;
            }
            Err(e) => {
                error!(error = %e, "Home Assistant API initialization failed");
                self.publish(LinkState::Failed);
            }
        }
    }

    async fn immediate_sync(&self) {
        if !self.engine.api().is_initialized() {
            warn!("sync requested before API initialization, ignoring");
            return;
        }
        info!("processing immediate sync request");
        let report = self.reconcile_switches().await;
        self.finish_pass(report);
        sleep(self.schedule.post_sync_pause).await;
    }

    fn apply_enabled(&self, entity_id: &str, enabled: bool) {
        match self.engine.set_enabled(entity_id, enabled) {
            Ok(_) => {
                if let Some(summary) = self.engine.registry().summary(entity_id) {
                    self.ui.set_device_status(&summary.key, summary.sync_status);
                }
            }
            Err(e) => warn!(error = %e, "enable request rejected"),
        }
    }

    /// User toggle: read the UI, set the intent, push right away.
    async fn push_intent(&self, entity_id: &str) {
        let Some(record) = self.engine.registry().get(entity_id) else {
            warn!(entity = %entity_id, "push requested for unknown device");
            return;
        };
        let Some(on) = self.ui.get_toggle(&record.key) else {
            warn!(entity = %entity_id, key = %record.key, "UI has no toggle for device");
            return;
        };
        if let Err(e) = self.engine.set_local_intent(entity_id, DeviceState::from(on)) {
            warn!(error = %e, "intent rejected");
            return;
        }
        if !self.engine.api().is_initialized() {
            debug!(entity = %entity_id, "API not initialized, intent kept for later");
            return;
        }

        match self.engine.synchronize(entity_id).await {
            Ok(_) => {
                self.push_device(entity_id);
                self.publish(LinkState::Connected);
            }
            // Per-device condition; the link itself is fine.
            Err(SyncError::Disabled(_)) => {
                info!(entity = %entity_id, "device disabled, toggle not pushed");
                self.push_device(entity_id);
            }
            Err(e) => {
                warn!(error = %e, "push failed");
                self.push_device(entity_id);
                self.publish(LinkState::SyncError);
            }
        }
    }

    // ── Timed cycle ──────────────────────────────────────────────────

    async fn run_cycle(&mut self) {
        self.cycle = self.cycle.wrapping_add(1);
        let cycle = self.cycle;

        if every(self.schedule.health_every, cycle) {
            self.report_health(cycle);
        }
        if !self.engine.api().is_initialized() {
            warn!(cycle, "API not initialized, skipping device state fetch");
            return;
        }

        info!(cycle, "syncing switch states");
        self.publish(LinkState::Syncing);
        let report = self.reconcile_switches().await;

        if every(self.schedule.sensor_every, cycle) && !self.sensors.is_empty() {
            self.refresh_sensors().await;
        }

        self.finish_pass(report);
        info!(
            cycle,
            observed = report.observed,
            failed = report.failed,
            pushed = report.pushed,
            "device state sync completed"
        );
    }

    fn finish_pass(&self, report: PassReport) {
        if report.failed == 0 {
            self.publish(LinkState::Connected);
        } else {
            self.publish(LinkState::SyncError);
        }
    }

    /// Bulk read of every enabled device, per-entity fallback for whatever
    /// the bulk read missed, then push any pending local intents.
    async fn reconcile_switches(&self) -> PassReport {
        let mut report = PassReport::default();
        let ids = self.engine.registry().enabled_entity_ids();
        if ids.is_empty() {
            debug!("no enabled devices to sync");
            return report;
        }

        let bulk = guarded(
            self.engine.watchdog(),
            self.engine.api().get_multiple_entity_states(&ids),
        )
        .await;

        let missing: Vec<String> = match bulk {
            Ok(states) => {
                for state in &states {
                    self.observe(&state.entity_id, state);
                    report.observed += 1;
                }
                Vec::new()
            }
            Err(ApiError::PartialNotFound {
                states,
                found,
                requested,
            }) => {
                warn!(
                    found,
                    requested, "bulk fetch incomplete, falling back for missing devices"
                );
                let mut missing = Vec::new();
                for (id, state) in ids.iter().zip(states) {
                    match state {
                        Some(state) => {
                            self.observe(id, &state);
                            report.observed += 1;
                        }
                        None => missing.push(id.clone()),
                    }
                }
                missing
            }
            Err(e) => {
                warn!(error = %e, "bulk fetch failed, falling back to per-entity reads");
                ids
            }
        };

        for (i, id) in missing.iter().enumerate() {
            if i > 0 {
                sleep(self.schedule.fallback_delay).await;
            }
            if self.cancel.is_cancelled() {
                debug!(
                    remaining = missing.len() - i,
                    "stop requested, abandoning fallback reads"
                );
                return report;
            }
            let read =
                guarded(self.engine.watchdog(), self.engine.api().get_entity_state(id)).await;
            match read {
                Ok(state) => {
                    self.observe(id, &state);
                    report.observed += 1;
                }
                Err(e) => {
                    self.engine.record_failure(id, &e);
                    self.push_device(id);
                    report.failed += 1;
                }
            }
        }

        for id in self.engine.registry().pending_pushes() {
            if self.cancel.is_cancelled() {
                debug!("stop requested, leaving pending intents for the next worker");
                break;
            }
            report.pushed += 1;
            if let Err(e) = self.engine.synchronize(&id).await {
                warn!(error = %e, "pending intent push failed");
                report.failed += 1;
            }
            self.push_device(&id);
        }

        report
    }

    fn observe(&self, entity_id: &str, state: &EntityState) {
        let remote = DeviceState::from_remote(&state.state);
        if self.engine.record_observation(entity_id, remote).is_some() {
            self.push_device(entity_id);
        }
    }

    /// Send a device's current view to the UI. Unknown remote states leave
    /// the indicator where it was.
    fn push_device(&self, entity_id: &str) {
        let Some(summary) = self.engine.registry().summary(entity_id) else {
            return;
        };
        if let Some(on) = summary.indicator() {
            self.ui.set_indicator(&summary.key, on);
        }
        self.ui.set_device_status(&summary.key, summary.sync_status);
    }

    async fn refresh_sensors(&self) {
        sleep(self.schedule.sensor_lead).await;
        for (i, sensor) in self.sensors.iter().enumerate() {
            if i > 0 {
                sleep(self.schedule.sensor_gap).await;
            }
            if self.cancel.is_cancelled() {
                return;
            }
            match guarded(
                self.engine.watchdog(),
                self.engine.api().get_sensor_value(&sensor.entity_id),
            )
            .await
            {
                Ok(value) => {
                    debug!(sensor = %sensor.entity_id, value, "sensor updated");
                    self.ui.set_sensor(&sensor.key, value);
                }
                Err(e) => warn!(sensor = %sensor.entity_id, error = %e, "sensor read failed"),
            }
        }
    }

    fn report_health(&self, cycle: u64) {
        let snap = self.health.snapshot();
        info!(
            cycle,
            stack_margin = ?snap.stack_margin,
            free_memory = ?snap.free_memory,
            min_free_memory = ?snap.min_free_memory,
            "health report"
        );
        if snap.stack_is_low() {
            warn!(stack_margin = ?snap.stack_margin, "sync worker stack margin is low");
        }
        if snap.memory_is_low() {
            warn!(free_memory = ?snap.free_memory, "free memory is low");
        }
    }
}

fn every(n: u64, cycle: u64) -> bool {
    n != 0 && cycle % n == 0
}
