// Wire types for the Home Assistant REST API.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `GET /api/states/{entity_id}`.
///
/// Only `state` is required; everything else is metadata that newer or
/// trimmed-down Home Assistant proxies may omit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityState {
    #[serde(default)]
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub last_changed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl EntityState {
    /// A bare state with no attributes or timestamps.
    pub fn new(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes: HashMap::new(),
            last_changed: None,
            last_updated: None,
        }
    }

    /// `unit_of_measurement` attribute, if the entity reports one.
    pub fn unit_of_measurement(&self) -> Option<&str> {
        self.attributes
            .get("unit_of_measurement")
            .and_then(serde_json::Value::as_str)
    }

    /// `friendly_name` attribute, if set.
    pub fn friendly_name(&self) -> Option<&str> {
        self.attributes
            .get("friendly_name")
            .and_then(serde_json::Value::as_str)
    }
}

/// Body of `GET /api/`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiStatus {
    #[serde(default)]
    pub message: String,
}
