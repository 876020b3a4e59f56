// ── Device sync engine ──
//
// Per-device reconciliation on top of the registry: passive status
// checks, active pushes with verification, and the failure breaker.

use std::sync::Arc;

use hasslink_api::{ApiError, ServiceCall};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::api::StateApi;
use crate::bridge::{Watchdog, guarded};
use crate::config::SyncPolicy;
use crate::error::SyncError;
use crate::model::{DeviceState, DeviceSummary, DeviceSyncRecord, SyncStatus};
use crate::registry::DeviceRegistry;

pub struct SyncEngine<A> {
    api: A,
    registry: Arc<DeviceRegistry>,
    policy: SyncPolicy,
    watchdog: Arc<dyn Watchdog>,
}

impl<A: StateApi> SyncEngine<A> {
    pub fn new(
        api: A,
        registry: Arc<DeviceRegistry>,
        policy: SyncPolicy,
        watchdog: Arc<dyn Watchdog>,
    ) -> Self {
        Self {
            api,
            registry,
            policy,
            watchdog,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn watchdog(&self) -> &dyn Watchdog {
        self.watchdog.as_ref()
    }

    fn record(&self, entity_id: &str) -> Result<DeviceSyncRecord, SyncError> {
        self.registry
            .get(entity_id)
            .ok_or_else(|| SyncError::UnknownDevice(entity_id.to_owned()))
    }

    fn ensure_initialized(&self, entity_id: &str) -> Result<(), SyncError> {
        if self.api.is_initialized() {
            Ok(())
        } else {
            Err(SyncError::Failure {
                entity_id: entity_id.to_owned(),
                source: ApiError::NotInitialized,
            })
        }
    }

    // ── Local operations ─────────────────────────────────────────────

    pub fn set_local_intent(&self, entity_id: &str, intent: DeviceState) -> Result<(), SyncError> {
        self.registry
            .update(entity_id, |r| r.set_local_intent(intent))
            .ok_or_else(|| SyncError::UnknownDevice(entity_id.to_owned()))??;
        debug!(entity = %entity_id, %intent, "local intent set");
        Ok(())
    }

    /// Manual enable/disable. Returns `true` if the flag changed.
    pub fn set_enabled(&self, entity_id: &str, enabled: bool) -> Result<bool, SyncError> {
        let changed = self
            .registry
            .update(entity_id, |r| r.set_enabled(enabled))
            .ok_or_else(|| SyncError::UnknownDevice(entity_id.to_owned()))?;
        if changed {
            info!(entity = %entity_id, enabled, "device sync toggled");
        }
        Ok(changed)
    }

    pub fn sync_status(&self, entity_id: &str) -> Result<SyncStatus, SyncError> {
        Ok(self.record(entity_id)?.sync_status)
    }

    // ── Observations ─────────────────────────────────────────────────

    /// Apply a successful read performed elsewhere (bulk or fallback).
    ///
    /// Status is computed against the intent current at write-back time.
    pub fn record_observation(
        &self,
        entity_id: &str,
        remote: DeviceState,
    ) -> Option<DeviceSummary> {
        let now = Instant::now();
        self.registry.update(entity_id, |r| {
            r.apply_read(remote, now);
            if r.adopt_remote(now) {
                debug!(entity = %entity_id, state = %remote, "adopted remote state");
            }
            r.summary()
        })
    }

    /// Count a failed read or push against the device.
    pub fn record_failure(&self, entity_id: &str, err: &ApiError) -> Option<DeviceSummary> {
        let now = Instant::now();
        let ceiling = self.policy.failure_ceiling;
        let (tripped, summary) = self.registry.update(entity_id, |r| {
            let tripped = r.apply_failure(ceiling, now);
            (tripped, r.summary())
        })?;

        if tripped {
            error!(
                entity = %entity_id,
                attempts = summary.failed_attempts,
                error = %err,
                "device disabled after repeated sync failures"
            );
        } else {
            warn!(
                entity = %entity_id,
                attempts = summary.failed_attempts,
                error = %err,
                "device sync failed"
            );
        }
        Some(summary)
    }

    // ── Network operations ───────────────────────────────────────────

    /// Passive read. Rate limited per device by `check_interval`; a call
    /// inside the window returns the current status without a request.
    pub async fn check_status(&self, entity_id: &str) -> Result<SyncStatus, SyncError> {
        let record = self.record(entity_id)?;
        if !record.is_enabled {
            return Ok(record.sync_status);
        }
        let now = Instant::now();
        if record
            .last_check_time
            .is_some_and(|t| now.saturating_duration_since(t) < self.policy.check_interval)
        {
            return Ok(record.sync_status);
        }
        self.ensure_initialized(entity_id)?;

        match guarded(self.watchdog(), self.api.get_entity_state(entity_id)).await {
            Ok(state) => {
                let remote = DeviceState::from_remote(&state.state);
                let now = Instant::now();
                let status = self
                    .registry
                    .update(entity_id, |r| {
                        r.apply_read(remote, now);
                        r.sync_status
                    })
                    .ok_or_else(|| SyncError::UnknownDevice(entity_id.to_owned()))?;
                Ok(status)
            }
            Err(source) => {
                self.record_failure(entity_id, &source);
                Err(SyncError::Failure {
                    entity_id: entity_id.to_owned(),
                    source,
                })
            }
        }
    }

    /// Push the local intent with a service call, wait, then read back.
    ///
    /// A remote that disagrees after a successful call is `OutOfSync`, not
    /// a failure.
    pub async fn synchronize(&self, entity_id: &str) -> Result<SyncStatus, SyncError> {
        let record = self.record(entity_id)?;
        if !record.is_enabled {
            return Err(SyncError::Disabled(entity_id.to_owned()));
        }
        let on = record
            .local_intent
            .as_bool()
            .ok_or_else(|| SyncError::NoIntent(entity_id.to_owned()))?;
        self.ensure_initialized(entity_id)?;

        let call = ServiceCall::new(record.domain.service(on), entity_id);
        if let Err(source) = guarded(self.watchdog(), self.api.call_service(&call)).await {
            self.record_failure(entity_id, &source);
            return Err(SyncError::Failure {
                entity_id: entity_id.to_owned(),
                source,
            });
        }

        tokio::time::sleep(self.policy.verify_delay).await;

        match guarded(self.watchdog(), self.api.get_entity_state(entity_id)).await {
            Ok(state) => {
                let remote = DeviceState::from_remote(&state.state);
                let summary = self
                    .record_observation(entity_id, remote)
                    .ok_or_else(|| SyncError::UnknownDevice(entity_id.to_owned()))?;
                info!(entity = %entity_id, status = %summary.sync_status, "intent pushed");
                Ok(summary.sync_status)
            }
            Err(source) => {
                self.record_failure(entity_id, &source);
                Err(SyncError::Failure {
                    entity_id: entity_id.to_owned(),
                    source,
                })
            }
        }
    }
}
