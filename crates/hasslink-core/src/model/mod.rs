// ── Domain model ──

mod record;
mod spec;
mod state;

pub use record::{DeviceSummary, DeviceSyncRecord};
pub use spec::{DeviceSpec, SensorSpec, SwitchDomain};
pub use state::{DeviceState, LinkState, SyncStatus};
