// Wire shapes for `/api/states` and the parsed records handed to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, preview};

/// Attributes beyond this count are dropped when parsing.
pub const MAX_ATTRIBUTES: usize = 16;

/// Result of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub success: bool,
    pub body: String,
    /// Set when the body exceeded the response buffer and was cut.
    pub truncated: bool,
}

impl ApiResponse {
    pub fn error_message(&self) -> Option<String> {
        (!self.success).then(|| format!("HTTP {}", self.status))
    }
}

/// Raw `/api/states` record as Home Assistant serializes it.
#[derive(Debug, Deserialize)]
struct RawState {
    entity_id: String,
    state: String,
    #[serde(default)]
    attributes: serde_json::Map<String, Value>,
    #[serde(default)]
    last_changed: Option<DateTime<Utc>>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
}

/// Parsed entity state with a bounded attribute list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    pub friendly_name: Option<String>,
    /// At most [`MAX_ATTRIBUTES`] pairs; non-string values kept as compact JSON.
    pub attributes: Vec<(String, String)>,
    pub last_changed: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl EntityState {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `friendly_name` when present, otherwise the entity id.
    pub fn display_name(&self) -> &str {
        self.friendly_name.as_deref().unwrap_or(&self.entity_id)
    }

    /// Parse a single-entity body.
    pub fn from_json(body: &str) -> Result<Self, ApiError> {
        let raw: RawState = serde_json::from_str(body).map_err(|e| parse_error(&e, body))?;
        Ok(raw.into())
    }

    pub(crate) fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value::<RawState>(value).map(Into::into)
    }
}

impl From<RawState> for EntityState {
    fn from(raw: RawState) -> Self {
        let friendly_name = raw
            .attributes
            .get("friendly_name")
            .and_then(Value::as_str)
            .map(str::to_owned);

        let attributes = raw
            .attributes
            .into_iter()
            .take(MAX_ATTRIBUTES)
            .map(|(k, v)| {
                let text = match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, text)
            })
            .collect();

        Self {
            entity_id: raw.entity_id,
            state: raw.state,
            friendly_name,
            attributes,
            last_changed: raw.last_changed,
            last_updated: raw.last_updated,
        }
    }
}

pub(crate) fn parse_error(e: &serde_json::Error, body: &str) -> ApiError {
    ApiError::Parse {
        message: e.to_string(),
        body_preview: preview(body),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_friendly_name_and_attributes() {
        let body = json!({
            "entity_id": "switch.kitchen",
            "state": "on",
            "attributes": {
                "friendly_name": "Kitchen",
                "icon": "mdi:lightbulb",
                "current": 0.42
            },
            "last_changed": "2024-05-01T10:00:00+00:00"
        })
        .to_string();

        let st = EntityState::from_json(&body).unwrap();
        assert_eq!(st.entity_id, "switch.kitchen");
        assert_eq!(st.state, "on");
        assert_eq!(st.display_name(), "Kitchen");
        assert_eq!(st.attribute("icon"), Some("mdi:lightbulb"));
        assert_eq!(st.attribute("current"), Some("0.42"));
        assert!(st.last_changed.is_some());
        assert!(st.last_updated.is_none());
    }

    #[test]
    fn caps_attribute_count() {
        let attrs: serde_json::Map<String, Value> = (0..40)
            .map(|i| (format!("a{i:02}"), Value::from(i)))
            .collect();
        let body = json!({ "entity_id": "sensor.x", "state": "1", "attributes": attrs }).to_string();

        let st = EntityState::from_json(&body).unwrap();
        assert_eq!(st.attributes.len(), MAX_ATTRIBUTES);
        assert_eq!(st.display_name(), "sensor.x");
    }

    #[test]
    fn missing_state_is_parse_error() {
        let err = EntityState::from_json(r#"{"entity_id":"switch.a"}"#).unwrap_err();
        match err {
            ApiError::Parse { body_preview, .. } => assert!(body_preview.contains("switch.a")),
            other => panic!("expected Parse, got {other:?}"),
        }
    }
}
