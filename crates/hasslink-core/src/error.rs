// ── Core error types ──
//
// `SyncError` is device-level and feeds the breaker; `CoreError` is what
// callers of the handle and supervisor see.

use hasslink_api::{ApiError, ConfigError};
use thiserror::Error;

use crate::model::DeviceState;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unknown device: {0}")]
    UnknownDevice(String),

    #[error("{state} is not a valid target for {entity_id}")]
    InvalidIntent {
        entity_id: String,
        state: DeviceState,
    },

    #[error("{0} is disabled")]
    Disabled(String),

    #[error("{0} has no local intent to push")]
    NoIntent(String),

    /// Remote read or service call failed; counted against the device.
    #[error("sync failed for {entity_id}: {source}")]
    Failure {
        entity_id: String,
        #[source]
        source: ApiError,
    },
}

impl SyncError {
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Failure { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("sync worker command queue is full")]
    QueueFull,

    #[error("sync worker is not running")]
    WorkerStopped,
}

impl CoreError {
    /// Short status-line text.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Config(_) => "Failed",
            Self::Api(e) => e.describe(),
            Self::Sync(SyncError::Disabled(_)) => "Disabled",
            Self::Sync(SyncError::Failure { source, .. }) => source.describe(),
            Self::Sync(_) => "Invalid argument",
            Self::QueueFull => "Busy",
            Self::WorkerStopped => "Offline",
        }
    }
}
