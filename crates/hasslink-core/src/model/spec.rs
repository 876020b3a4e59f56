// ── Tracked entity descriptions ──

use hasslink_api::{Service, SwitchAction};
use serde::{Deserialize, Serialize};

/// Service domain of a switch-like entity, taken from its id prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchDomain {
    #[default]
    Switch,
    Light,
}

impl SwitchDomain {
    pub fn from_entity_id(entity_id: &str) -> Self {
        if entity_id.starts_with("light.") {
            Self::Light
        } else {
            Self::Switch
        }
    }

    /// `turn_on` / `turn_off` in this domain.
    pub fn service(self, on: bool) -> Service {
        let action = SwitchAction::set(on);
        match self {
            Self::Switch => Service::Switch(action),
            Self::Light => Service::Light(action),
        }
    }
}

/// A switch the worker keeps in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub entity_id: String,
    /// Display label; defaults to the entity id.
    pub friendly_name: String,
    /// Short handle the UI uses (`"a"`, `"kitchen"`, ...).
    pub key: String,
}

impl DeviceSpec {
    pub fn new(entity_id: impl Into<String>, key: impl Into<String>) -> Self {
        let entity_id = entity_id.into();
        Self {
            friendly_name: entity_id.clone(),
            entity_id,
            key: key.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = name.into();
        self
    }
}

/// An auxiliary numeric sensor pushed to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSpec {
    pub entity_id: String,
    pub key: String,
    #[serde(default)]
    pub unit: Option<String>,
}

impl SensorSpec {
    pub fn new(entity_id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            key: key.into(),
            unit: None,
        }
    }
}
