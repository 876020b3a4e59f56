// Test doubles shared by the worker and supervisor tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::future::{Future, ready};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hasslink_api::{
    ApiError, ApiResponse, ConfigError, EntityState, ServerConfig, Service, ServiceCall,
    SwitchAction,
};
use hasslink_core::{
    Bridges, DeviceSpec, HealthProbe, HealthSnapshot, LinkState, StateApi, SyncConfig, SyncStatus,
    UiBridge, Watchdog,
};
use secrecy::SecretString;

// ── Fake API ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeState {
    pub remote: HashMap<String, String>,
    pub sensors: HashMap<String, f32>,
    pub bulk_fails: bool,
    /// Bulk reads take this long to answer; the answer reflects `remote`
    /// at the time the read was issued.
    pub bulk_delay: Option<Duration>,
    pub hidden_from_bulk: HashSet<String>,
    pub failing_reads: HashSet<String>,
    pub init_fails: bool,
    /// Service calls change `remote` like a real server would.
    pub apply_calls: bool,
    pub calls: Vec<ServiceCall>,
    pub bulk_reads: usize,
    pub single_reads: Vec<String>,
    pub inits: usize,
    pub deinits: usize,
}

pub type Shared = Arc<Mutex<FakeState>>;

pub fn shared(remote: &[(&str, &str)]) -> Shared {
    let state = FakeState {
        remote: remote
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect(),
        ..FakeState::default()
    };
    Arc::new(Mutex::new(state))
}

pub struct FakeApi {
    shared: Shared,
    initialized: bool,
}

impl FakeApi {
    pub fn new(shared: &Shared) -> Self {
        Self {
            shared: Arc::clone(shared),
            initialized: false,
        }
    }
}

fn entity(id: &str, state: &str) -> EntityState {
    EntityState {
        entity_id: id.to_owned(),
        state: state.to_owned(),
        friendly_name: None,
        attributes: Vec::new(),
        last_changed: None,
        last_updated: None,
    }
}

fn timeout() -> ApiError {
    ApiError::Http {
        status: 504,
        message: "Gateway Timeout".into(),
    }
}

impl StateApi for FakeApi {
    fn init(&mut self) -> Result<(), ConfigError> {
        let mut s = self.shared.lock().unwrap();
        if s.init_fails {
            return Err(ConfigError::MissingToken);
        }
        s.inits += 1;
        self.initialized = true;
        Ok(())
    }

    fn deinit(&mut self) {
        if self.initialized {
            self.shared.lock().unwrap().deinits += 1;
        }
        self.initialized = false;
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn get_entity_state(
        &self,
        entity_id: &str,
    ) -> impl Future<Output = Result<EntityState, ApiError>> + Send {
        let mut s = self.shared.lock().unwrap();
        s.single_reads.push(entity_id.to_owned());
        let out = if s.failing_reads.contains(entity_id) {
            Err(timeout())
        } else {
            s.remote
                .get(entity_id)
                .map(|v| entity(entity_id, v))
                .ok_or(ApiError::Http {
                    status: 404,
                    message: "Entity not found.".into(),
                })
        };
        ready(out)
    }

    fn get_multiple_entity_states(
        &self,
        entity_ids: &[String],
    ) -> impl Future<Output = Result<Vec<EntityState>, ApiError>> + Send {
        let mut s = self.shared.lock().unwrap();
        s.bulk_reads += 1;
        let delay = s.bulk_delay;
        let out = if s.bulk_fails {
            Err(timeout())
        } else {
            let states: Vec<Option<EntityState>> = entity_ids
                .iter()
                .map(|id| {
                    if s.hidden_from_bulk.contains(id) {
                        None
                    } else {
                        s.remote.get(id).map(|v| entity(id, v))
                    }
                })
                .collect();
            let found = states.iter().filter(|s| s.is_some()).count();
            if found == entity_ids.len() {
                Ok(states.into_iter().flatten().collect())
            } else if found == 0 {
                Err(ApiError::NotFound)
            } else {
                Err(ApiError::PartialNotFound {
                    found,
                    requested: entity_ids.len(),
                    states,
                })
            }
        };
        drop(s);
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            out
        }
    }

    fn call_service(
        &self,
        call: &ServiceCall,
    ) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send {
        let mut s = self.shared.lock().unwrap();
        s.calls.push(call.clone());
        if s.apply_calls {
            let value = match call.service {
                Service::Switch(SwitchAction::TurnOn) | Service::Light(SwitchAction::TurnOn) => {
                    Some("on")
                }
                Service::Switch(SwitchAction::TurnOff) | Service::Light(SwitchAction::TurnOff) => {
                    Some("off")
                }
                _ => None,
            };
            if let Some(v) = value {
                s.remote.insert(call.entity_id.clone(), v.to_owned());
            }
        }
        ready(Ok(ApiResponse {
            status: 200,
            success: true,
            body: "[]".into(),
            truncated: false,
        }))
    }

    fn get_sensor_value(
        &self,
        entity_id: &str,
    ) -> impl Future<Output = Result<f32, ApiError>> + Send {
        let s = self.shared.lock().unwrap();
        ready(s.sensors.get(entity_id).copied().ok_or(ApiError::NotFound))
    }
}

// ── Bridges ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingUi {
    pub indicators: Mutex<HashMap<String, bool>>,
    pub toggles: Mutex<HashMap<String, bool>>,
    pub statuses: Mutex<Vec<LinkState>>,
    pub sensors: Mutex<HashMap<String, f32>>,
    pub device_status: Mutex<HashMap<String, SyncStatus>>,
}

impl RecordingUi {
    pub fn indicator(&self, key: &str) -> Option<bool> {
        self.indicators.lock().unwrap().get(key).copied()
    }

    pub fn set_toggle(&self, key: &str, on: bool) {
        self.toggles.lock().unwrap().insert(key.to_owned(), on);
    }

    pub fn last_status(&self) -> Option<LinkState> {
        self.statuses.lock().unwrap().last().copied()
    }
}

impl UiBridge for RecordingUi {
    fn set_indicator(&self, key: &str, on: bool) {
        self.indicators.lock().unwrap().insert(key.to_owned(), on);
    }

    fn get_toggle(&self, key: &str) -> Option<bool> {
        self.toggles.lock().unwrap().get(key).copied()
    }

    fn set_status(&self, state: LinkState) {
        self.statuses.lock().unwrap().push(state);
    }

    fn set_sensor(&self, key: &str, value: f32) {
        self.sensors.lock().unwrap().insert(key.to_owned(), value);
    }

    fn set_device_status(&self, key: &str, status: SyncStatus) {
        self.device_status
            .lock()
            .unwrap()
            .insert(key.to_owned(), status);
    }
}

#[derive(Default)]
pub struct CountingWatchdog {
    pub feeds: AtomicUsize,
}

impl CountingWatchdog {
    pub fn count(&self) -> usize {
        self.feeds.load(Ordering::SeqCst)
    }
}

impl Watchdog for CountingWatchdog {
    fn feed(&self) {
        self.feeds.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct CountingProbe {
    pub snapshots: AtomicUsize,
}

impl HealthProbe for CountingProbe {
    fn snapshot(&self) -> HealthSnapshot {
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        HealthSnapshot {
            stack_margin: Some(4096),
            free_memory: Some(1_000_000),
            min_free_memory: None,
        }
    }
}

// ── Config ──────────────────────────────────────────────────────────

pub fn three_switches() -> SyncConfig {
    let server = ServerConfig::new("ha.test", 8123, SecretString::from("token".to_owned()));
    SyncConfig::new(
        server,
        vec![
            DeviceSpec::new("switch.a", "a"),
            DeviceSpec::new("switch.b", "b"),
            DeviceSpec::new("switch.c", "c"),
        ],
    )
}

pub struct Rig {
    pub ui: Arc<RecordingUi>,
    pub watchdog: Arc<CountingWatchdog>,
    pub health: Arc<CountingProbe>,
    pub bridges: Bridges,
}

pub fn rig() -> Rig {
    let ui = Arc::new(RecordingUi::default());
    let watchdog = Arc::new(CountingWatchdog::default());
    let health = Arc::new(CountingProbe::default());
    let bridges = Bridges::new(ui.clone())
        .with_watchdog(watchdog.clone())
        .with_health(health.clone());
    Rig {
        ui,
        watchdog,
        health,
        bridges,
    }
}
