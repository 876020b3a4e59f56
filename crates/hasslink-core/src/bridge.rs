// ── Presentation / control bridge ──
//
// Narrow contracts between the sync worker and whatever displays device
// state: a panel, a console, a test double.

use std::future::Future;

use crate::model::{LinkState, SyncStatus};

/// Display side of the bridge.
///
/// Called from the sync worker task; implementations must not block.
pub trait UiBridge: Send + Sync + 'static {
    /// Push a new indicator value for the device with this key.
    fn set_indicator(&self, key: &str, on: bool);

    /// Current position of the user-facing toggle, if the UI has one.
    fn get_toggle(&self, key: &str) -> Option<bool>;

    fn set_status(&self, _state: LinkState) {}

    fn set_sensor(&self, _key: &str, _value: f32) {}

    fn set_device_status(&self, _key: &str, _status: SyncStatus) {}
}

/// Liveness watchdog; fed immediately before and after each network call.
pub trait Watchdog: Send + Sync + 'static {
    fn feed(&self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWatchdog;

impl Watchdog for NoopWatchdog {
    fn feed(&self) {}
}

/// Resource figures for the periodic health report. Fields a platform
/// cannot measure stay `None`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub stack_margin: Option<usize>,
    pub free_memory: Option<u64>,
    pub min_free_memory: Option<u64>,
}

pub const LOW_STACK_MARGIN: usize = 512;
pub const LOW_FREE_MEMORY: u64 = 50_000;

impl HealthSnapshot {
    pub fn stack_is_low(&self) -> bool {
        self.stack_margin.is_some_and(|m| m < LOW_STACK_MARGIN)
    }

    pub fn memory_is_low(&self) -> bool {
        self.free_memory.is_some_and(|m| m < LOW_FREE_MEMORY)
    }
}

pub trait HealthProbe: Send + Sync + 'static {
    fn snapshot(&self) -> HealthSnapshot;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoHealthProbe;

impl HealthProbe for NoHealthProbe {
    fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot::default()
    }
}

/// Run `fut` with the watchdog fed on both sides.
pub(crate) async fn guarded<F: Future>(watchdog: &dyn Watchdog, fut: F) -> F::Output {
    watchdog.feed();
    let out = fut.await;
    watchdog.feed();
    out
}
