// Wire models for the hub's REST and WebSocket payloads.
//
// Registry payloads carry many more fields than we read; unknown fields
// are ignored so firmware additions never break decoding.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Attributes ───────────────────────────────────────────────────────

/// Free-form attribute map attached to an entity state.
///
/// The hub puts whatever the integration reports here, so every accessor
/// is fallible and type-checked rather than assuming a shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(Map<String, Value>);

impl Attributes {
    /// Raw value for `key`, whatever its JSON type.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value for `key`; `None` if absent or not a string.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Human-readable display name (`friendly_name`).
    pub fn friendly_name(&self) -> Option<&str> {
        self.str("friendly_name")
    }

    /// Explicit area label some integrations attach (`area`). Empty strings
    /// are treated as absent.
    pub fn area(&self) -> Option<&str> {
        self.str("area").filter(|s| !s.is_empty())
    }
}

impl From<Map<String, Value>> for Attributes {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ── EntityState ──────────────────────────────────────────────────────

/// One entity's current reading as returned by `GET /api/states`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// Namespaced identifier, e.g. `"light.kitchen"`.
    pub entity_id: String,
    /// Status string, e.g. `"on"`, `"off"`, `"unavailable"`.
    pub state: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub last_changed: String,
    #[serde(default)]
    pub last_updated: String,
    /// Resolved area, attached by enrichment. Never sent by the hub.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<Area>,
}

impl EntityState {
    /// The domain prefix of the entity id (`"light"` for `"light.kitchen"`).
    pub fn domain(&self) -> Option<&str> {
        self.entity_id.split_once('.').map(|(domain, _)| domain)
    }
}

// ── Registries ───────────────────────────────────────────────────────

/// A physical location grouping devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub area_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl Area {
    /// An area with only id and display name.
    pub fn new(area_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            area_id: area_id.into(),
            name: name.into(),
            picture: None,
            aliases: Vec::new(),
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.area_id)
    }
}

/// A device registry entry. Only used as a join key between entities
/// and areas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub area_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Binding of an entity to a device and/or directly to an area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRegistration {
    pub entity_id: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub device_id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub area_id: Option<String>,
}

/// Registries report "no value" as `null`, a missing key, or `""`.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
