// Closed set of service calls the client knows how to issue.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SwitchAction {
    TurnOn,
    TurnOff,
    Toggle,
}

impl SwitchAction {
    /// Action that drives an entity to the given on/off value.
    pub fn set(on: bool) -> Self {
        if on { Self::TurnOn } else { Self::TurnOff }
    }
}

/// Domain + service pair. Invalid combinations are unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Switch(SwitchAction),
    Light(SwitchAction),
    SceneActivate,
}

impl Service {
    pub fn domain(self) -> &'static str {
        match self {
            Self::Switch(_) => "switch",
            Self::Light(_) => "light",
            Self::SceneActivate => "scene",
        }
    }

    pub fn service(self) -> &'static str {
        match self {
            Self::Switch(a) | Self::Light(a) => match a {
                SwitchAction::TurnOn => "turn_on",
                SwitchAction::TurnOff => "turn_off",
                SwitchAction::Toggle => "toggle",
            },
            Self::SceneActivate => "turn_on",
        }
    }

    /// `services/{domain}/{service}`, relative to the API base.
    pub fn path(self) -> String {
        format!("services/{}/{}", self.domain(), self.service())
    }
}

/// One `POST /api/services/...` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCall {
    pub service: Service,
    pub entity_id: String,
    pub data: Map<String, Value>,
}

impl ServiceCall {
    pub fn new(service: Service, entity_id: impl Into<String>) -> Self {
        Self {
            service,
            entity_id: entity_id.into(),
            data: Map::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// `{ "entity_id": ..., ...data }`; a stray `entity_id` in `data` loses.
    pub fn body(&self) -> Value {
        let mut body = self.data.clone();
        body.insert("entity_id".into(), Value::String(self.entity_id.clone()));
        Value::Object(body)
    }
}
