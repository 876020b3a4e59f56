// ── Runtime sync configuration ──
//
// Describes what to track and how often. Never touches disk; the CLI
// builds a `SyncConfig` from a profile and hands it in.

use std::time::Duration;

use hasslink_api::{ServerConfig, TransportConfig};

use crate::model::{DeviceSpec, SensorSpec};

/// Breaker and per-device timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Consecutive failures before a device is disabled.
    pub failure_ceiling: u8,
    /// Minimum spacing between two `check_status` reads of one device.
    pub check_interval: Duration,
    /// Pause between a service call and its verifying read.
    pub verify_delay: Duration,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            failure_ceiling: 3,
            check_interval: Duration::from_secs(5),
            verify_delay: Duration::from_millis(500),
        }
    }
}

/// Worker loop timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub sync_interval: Duration,
    /// Gap between consecutive per-entity fallback reads.
    pub fallback_delay: Duration,
    /// Sensors are read on every Nth cycle; 0 disables them.
    pub sensor_every: u64,
    pub sensor_lead: Duration,
    pub sensor_gap: Duration,
    /// Health report every Nth cycle; 0 disables it.
    pub health_every: u64,
    /// Pause after an on-demand sync.
    pub post_sync_pause: Duration,
    pub command_queue: usize,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(30),
            fallback_delay: Duration::from_millis(200),
            sensor_every: 2,
            sensor_lead: Duration::from_millis(500),
            sensor_gap: Duration::from_millis(300),
            health_every: 10,
            post_sync_pause: Duration::from_secs(1),
            command_queue: 16,
        }
    }
}

/// Everything needed to run a sync worker against one server.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub server: ServerConfig,
    pub transport: TransportConfig,
    pub devices: Vec<DeviceSpec>,
    pub sensors: Vec<SensorSpec>,
    pub policy: SyncPolicy,
    pub schedule: Schedule,
}

impl SyncConfig {
    pub fn new(server: ServerConfig, devices: Vec<DeviceSpec>) -> Self {
        Self {
            server,
            transport: TransportConfig::default(),
            devices,
            sensors: Vec::new(),
            policy: SyncPolicy::default(),
            schedule: Schedule::default(),
        }
    }
}
