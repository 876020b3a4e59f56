// ── State vocabulary ──
//
// On/off values as Home Assistant reports them, the per-device sync
// status, and the worker link state shown on the status line.

use serde::{Deserialize, Serialize};

// ── DeviceState ─────────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DeviceState {
    On,
    Off,
    Unavailable,
    #[default]
    Unknown,
}

impl DeviceState {
    /// Map a remote `state` string. Anything unrecognized is `Unknown`.
    pub fn from_remote(state: &str) -> Self {
        state.trim().parse().unwrap_or(Self::Unknown)
    }

    /// `On`/`Off` only.
    pub fn is_defined(self) -> bool {
        matches!(self, Self::On | Self::Off)
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::On => Some(true),
            Self::Off => Some(false),
            Self::Unavailable | Self::Unknown => None,
        }
    }
}

impl From<bool> for DeviceState {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

// ── SyncStatus ──────────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    #[default]
    Unknown,
    Synced,
    OutOfSync,
    Failed,
    Disabled,
}

// ── LinkState ───────────────────────────────────────────────────────

/// Sync worker state, published on a `watch` channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum LinkState {
    /// No worker running.
    #[default]
    Offline,
    Starting,
    /// Worker running, API not initialized.
    Ready,
    Connected,
    Syncing,
    SyncError,
    /// API init failed; needs a new init request.
    Failed,
    Stopping,
}

impl LinkState {
    /// Status line text.
    pub fn label(self) -> &'static str {
        match self {
            Self::Offline => "Offline",
            Self::Starting => "Starting",
            Self::Ready => "Ready",
            Self::Connected => "Connected",
            Self::Syncing => "Syncing",
            Self::SyncError => "Sync Error",
            Self::Failed => "Failed",
            Self::Stopping => "Stopping",
        }
    }

    /// Whether the status indicator should show as connected.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::Syncing)
    }

    /// API initialized and the worker is reconciling.
    pub fn is_initialized(self) -> bool {
        matches!(self, Self::Connected | Self::Syncing | Self::SyncError)
    }
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_strings() {
        assert_eq!(DeviceState::from_remote("on"), DeviceState::On);
        assert_eq!(DeviceState::from_remote("OFF"), DeviceState::Off);
        assert_eq!(DeviceState::from_remote("unavailable"), DeviceState::Unavailable);
        assert_eq!(DeviceState::from_remote("42.1"), DeviceState::Unknown);
        assert_eq!(DeviceState::On.to_string(), "on");
    }

    #[test]
    fn status_strings() {
        assert_eq!(SyncStatus::OutOfSync.to_string(), "OUT_OF_SYNC");
        assert_eq!("DISABLED".parse::<SyncStatus>().ok(), Some(SyncStatus::Disabled));
        assert_eq!(LinkState::SyncError.to_string(), "Sync Error");
        assert!(!LinkState::SyncError.is_connected());
        assert!(LinkState::SyncError.is_initialized());
    }
}
