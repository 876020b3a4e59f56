// ── Per-device sync record ──
//
// All state transitions live here as plain synchronous methods so the
// engine, the bulk path and the tests share one state machine.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use super::spec::{DeviceSpec, SwitchDomain};
use super::state::{DeviceState, SyncStatus};
use crate::error::SyncError;

/// Local belief about one tracked switch.
///
/// `sync_status == Synced` implies `local_intent == remote_state` with both
/// defined. `failed_attempts` never exceeds the configured ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSyncRecord {
    pub entity_id: String,
    pub friendly_name: String,
    pub key: String,
    pub domain: SwitchDomain,
    pub local_intent: DeviceState,
    pub remote_state: DeviceState,
    pub sync_status: SyncStatus,
    pub last_sync_time: Option<Instant>,
    pub last_check_time: Option<Instant>,
    pub failed_attempts: u8,
    pub is_enabled: bool,
    /// Local intent came from the user and has not been confirmed remotely.
    pub intent_pending: bool,
}

impl DeviceSyncRecord {
    pub fn new(spec: &DeviceSpec) -> Self {
        Self {
            entity_id: spec.entity_id.clone(),
            friendly_name: spec.friendly_name.clone(),
            key: spec.key.clone(),
            domain: SwitchDomain::from_entity_id(&spec.entity_id),
            local_intent: DeviceState::Unknown,
            remote_state: DeviceState::Unknown,
            sync_status: SyncStatus::Unknown,
            last_sync_time: None,
            last_check_time: None,
            failed_attempts: 0,
            is_enabled: true,
            intent_pending: false,
        }
    }

    /// Successful remote read.
    pub fn apply_read(&mut self, remote: DeviceState, now: Instant) {
        self.remote_state = remote;
        self.failed_attempts = 0;
        self.last_check_time = Some(now);
        self.evaluate(now);
    }

    /// Failed remote read or push. Returns `true` when this failure tripped
    /// the breaker.
    pub fn apply_failure(&mut self, ceiling: u8, now: Instant) -> bool {
        self.last_check_time = Some(now);
        if !self.is_enabled {
            self.sync_status = SyncStatus::Disabled;
            return false;
        }
        let ceiling = ceiling.max(1);
        self.failed_attempts = self.failed_attempts.saturating_add(1).min(ceiling);
        if self.failed_attempts >= ceiling {
            self.is_enabled = false;
            self.sync_status = SyncStatus::Disabled;
            true
        } else {
            self.sync_status = SyncStatus::Failed;
            false
        }
    }

    /// User-originated target. Never touches the network.
    pub fn set_local_intent(&mut self, intent: DeviceState) -> Result<(), SyncError> {
        if !intent.is_defined() {
            return Err(SyncError::InvalidIntent {
                entity_id: self.entity_id.clone(),
                state: intent,
            });
        }
        self.local_intent = intent;
        self.intent_pending = true;
        if self.sync_status == SyncStatus::Synced {
            self.sync_status = SyncStatus::Unknown;
        }
        Ok(())
    }

    /// Manual override. Returns `false` when already in the requested state.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.is_enabled == enabled {
            return false;
        }
        self.is_enabled = enabled;
        if enabled {
            self.failed_attempts = 0;
            self.sync_status = SyncStatus::Unknown;
        } else {
            self.sync_status = SyncStatus::Disabled;
        }
        true
    }

    /// Follow a remote change that no pending local intent accounts for.
    /// Returns `true` if the local intent changed.
    pub fn adopt_remote(&mut self, now: Instant) -> bool {
        if self.intent_pending || !self.remote_state.is_defined() {
            return false;
        }
        if self.local_intent == self.remote_state {
            return false;
        }
        self.local_intent = self.remote_state;
        self.evaluate(now);
        true
    }

    fn evaluate(&mut self, now: Instant) {
        if !self.is_enabled {
            self.sync_status = SyncStatus::Disabled;
            return;
        }
        if self.remote_state.is_defined() && self.local_intent == self.remote_state {
            self.sync_status = SyncStatus::Synced;
            self.last_sync_time = Some(now);
            self.intent_pending = false;
        } else {
            self.sync_status = SyncStatus::OutOfSync;
        }
    }

    /// Intent diverges and should be pushed on the next cycle.
    pub fn needs_push(&self) -> bool {
        self.is_enabled
            && self.intent_pending
            && self.local_intent.is_defined()
            && matches!(
                self.sync_status,
                SyncStatus::OutOfSync | SyncStatus::Unknown | SyncStatus::Failed
            )
    }

    pub fn summary(&self) -> DeviceSummary {
        let now = Instant::now();
        DeviceSummary {
            entity_id: self.entity_id.clone(),
            friendly_name: self.friendly_name.clone(),
            key: self.key.clone(),
            local_intent: self.local_intent,
            remote_state: self.remote_state,
            sync_status: self.sync_status,
            failed_attempts: self.failed_attempts,
            is_enabled: self.is_enabled,
            intent_pending: self.intent_pending,
            since_last_sync: self.last_sync_time.map(|t| now.saturating_duration_since(t)),
        }
    }
}

/// Read-only view handed to the UI side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    pub entity_id: String,
    pub friendly_name: String,
    pub key: String,
    pub local_intent: DeviceState,
    pub remote_state: DeviceState,
    pub sync_status: SyncStatus,
    pub failed_attempts: u8,
    pub is_enabled: bool,
    pub intent_pending: bool,
    #[serde(skip)]
    pub since_last_sync: Option<Duration>,
}

impl DeviceSummary {
    /// Value to show on the indicator: the last known remote state.
    pub fn indicator(&self) -> Option<bool> {
        self.remote_state.as_bool()
    }
}
