//! Device-state synchronization between a small fixed set of switches and a
//! Home Assistant server.
//!
//! - **[`SyncEngine`]** — per-device state machine: passive
//!   [`check_status`](SyncEngine::check_status), active
//!   [`synchronize`](SyncEngine::synchronize), and the failure breaker that
//!   disables a device after repeated failures.
//!
//! - **[`Orchestrator`]** — the single sync worker task. Drains a bounded
//!   command queue (init, sync now, pushes, stop), runs the timed
//!   bulk-then-fallback cycle and feeds the watchdog around each request.
//!
//! - **[`Supervisor`]** — starts and tears down workers as connectivity
//!   comes and goes.
//!
//! - **Bridges** ([`UiBridge`], [`Watchdog`], [`HealthProbe`]) — what the
//!   worker needs from the display and platform.

pub mod api;
pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod handle;
pub mod model;
pub mod orchestrator;
pub mod registry;
pub mod supervisor;

// ── Primary re-exports ──────────────────────────────────────────────
pub use api::StateApi;
pub use bridge::{HealthProbe, HealthSnapshot, NoHealthProbe, NoopWatchdog, UiBridge, Watchdog};
pub use config::{Schedule, SyncConfig, SyncPolicy};
pub use engine::SyncEngine;
pub use error::{CoreError, SyncError};
pub use handle::{Command, SyncHandle};
pub use model::{
    DeviceSpec, DeviceState, DeviceSummary, DeviceSyncRecord, LinkState, SensorSpec, SwitchDomain,
    SyncStatus,
};
pub use orchestrator::{Bridges, Orchestrator, Worker};
pub use registry::DeviceRegistry;
pub use supervisor::{Supervisor, hass_client_factory};
