use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Integration name used by the AC Infinity custom component.
pub const DOMAIN: &str = "ac_infinity";

/// Raw lookup result for an entity that is unbound or missing from the snapshot.
pub const MISSING_STATE: &str = "N/A";

/*
 * Home Assistant attributes are loosely typed. A stray number where a string
 * is expected must not make the whole snapshot unreadable, so string-ish
 * attributes are read leniently.
 */
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(num)) => Some(num.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    })
}

fn lenient_state<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct HassAttributes {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub device_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub friendly_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub integration: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub device_class: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub unit_of_measurement: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct HassState {
    #[serde(default, deserialize_with = "lenient_state")]
    pub state: String,
    #[serde(default)]
    pub attributes: HassAttributes,
}

impl HassState {
    #[must_use]
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            attributes: HassAttributes::default(),
        }
    }

    #[must_use]
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.attributes.device_id = Some(device_id.into());
        self
    }

    #[must_use]
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.attributes.friendly_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_integration(mut self, integration: impl Into<String>) -> Self {
        self.attributes.integration = Some(integration.into());
        self
    }

    #[must_use]
    pub fn with_device_class(mut self, device_class: impl Into<String>) -> Self {
        self.attributes.device_class = Some(device_class.into());
        self
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.attributes.unit_of_measurement = Some(unit.into());
        self
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.state.as_str(), "unavailable" | "unknown")
    }
}

/// Element of the list returned by `/api/states`.
#[derive(Deserialize)]
struct HassStateEntry {
    entity_id: String,
    #[serde(flatten)]
    state: HassState,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotRepr {
    Empty,
    Map(BTreeMap<String, HassState>),
    List(Vec<HassStateEntry>),
}

/// Every entity state known to the host at one point in time.
///
/// Keys are ordered, so everything derived from a snapshot is deterministic.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(from = "SnapshotRepr")]
pub struct StateSnapshot {
    states: BTreeMap<String, HassState>,
}

impl From<SnapshotRepr> for StateSnapshot {
    fn from(value: SnapshotRepr) -> Self {
        match value {
            SnapshotRepr::Empty => Self::default(),
            SnapshotRepr::Map(states) => Self { states },
            SnapshotRepr::List(entries) => entries
                .into_iter()
                .map(|entry| (entry.entity_id, entry.state))
                .collect(),
        }
    }
}

impl FromIterator<(String, HassState)> for StateSnapshot {
    fn from_iter<T: IntoIterator<Item = (String, HassState)>>(iter: T) -> Self {
        Self {
            states: iter.into_iter().collect(),
        }
    }
}

impl StateSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity_id: impl Into<String>, state: HassState) {
        self.states.insert(entity_id.into(), state);
    }

    #[must_use]
    pub fn get(&self, entity_id: &str) -> Option<&HassState> {
        self.states.get(entity_id)
    }

    /// Resolve an optional binding to its entity id, if the entity exists.
    #[must_use]
    pub fn resolve<'a>(&self, entity_id: Option<&'a str>) -> Option<&'a str> {
        entity_id.filter(|id| self.states.contains_key(*id))
    }

    /// Raw state of a bound entity, or [`MISSING_STATE`].
    #[must_use]
    pub fn state_of(&self, entity_id: Option<&str>) -> &str {
        entity_id
            .and_then(|id| self.states.get(id))
            .map_or(MISSING_STATE, |state| state.state.as_str())
    }

    #[must_use]
    pub fn attributes_of(&self, entity_id: Option<&str>) -> Option<&HassAttributes> {
        entity_id
            .and_then(|id| self.states.get(id))
            .map(|state| &state.attributes)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, HassState> {
        self.states.iter()
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl<'a> IntoIterator for &'a StateSnapshot {
    type Item = (&'a String, &'a HassState);
    type IntoIter = btree_map::Iter<'a, String, HassState>;

    fn into_iter(self) -> Self::IntoIter {
        self.states.iter()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct RegistryEntry {
    #[serde(default)]
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// Element of the list returned by `config/entity_registry/list`.
#[derive(Deserialize)]
struct RegistryListEntry {
    entity_id: String,
    #[serde(flatten)]
    entry: RegistryEntry,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RegistryRepr {
    Empty,
    Map(BTreeMap<String, RegistryEntry>),
    List(Vec<RegistryListEntry>),
}

/// Entity registry: which integration owns which entity.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(from = "RegistryRepr")]
pub struct EntityRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl From<RegistryRepr> for EntityRegistry {
    fn from(value: RegistryRepr) -> Self {
        match value {
            RegistryRepr::Empty => Self::default(),
            RegistryRepr::Map(entries) => Self { entries },
            RegistryRepr::List(list) => list
                .into_iter()
                .map(|item| (item.entity_id, item.entry))
                .collect(),
        }
    }
}

impl FromIterator<(String, RegistryEntry)> for EntityRegistry {
    fn from_iter<T: IntoIterator<Item = (String, RegistryEntry)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl EntityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity_id: impl Into<String>, platform: impl Into<String>) {
        self.entries.insert(
            entity_id.into(),
            RegistryEntry {
                platform: platform.into(),
                device_id: None,
            },
        );
    }

    #[must_use]
    pub fn get(&self, entity_id: &str) -> Option<&RegistryEntry> {
        self.entries.get(entity_id)
    }

    #[must_use]
    pub fn platform(&self, entity_id: &str) -> Option<&str> {
        self.get(entity_id).map(|entry| entry.platform.as_str())
    }

    #[must_use]
    pub fn device_id(&self, entity_id: &str) -> Option<&str> {
        self.get(entity_id).and_then(|entry| entry.device_id.as_deref())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
