use itertools::Itertools;
use serde::Serialize;
use serde_json::Value;

use acinfinity::{EntityRegistry, StateSnapshot, classify};
use acinfinity_api::config::{CardConfig, DeviceTypeOverride, ReadingSlot};
use acinfinity_api::error::{CardError, CardResult};
use acinfinity_api::event::CardEvent;

const ENTITY_PREFIXES: &[&str] = &["sensor.", "binary_sensor."];

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Toggle,
    /// Fixed choices, as `(value, label)` pairs.
    Select { options: Vec<(String, String)> },
    EntityPicker { options: Vec<String> },
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct EditorField {
    pub key: &'static str,
    pub label: &'static str,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub value: Value,
}

/// Configuration form for the card.
///
/// The editor works on its own copy of the configuration. Every edit
/// produces a new configuration which is handed back to the host.
#[derive(Clone, Debug, Default)]
pub struct Editor {
    config: CardConfig,
    snapshot: StateSnapshot,
    registry: EntityRegistry,
}

impl Editor {
    const TEXT_FIELDS: &'static [&'static str] = &["title"];
    const TOGGLE_FIELDS: &'static [&'static str] = &["auto_detect", "show_ports", "show_sensors"];

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_config(&mut self, config: &CardConfig) {
        self.config = config.clone();
    }

    pub fn set_hass(&mut self, snapshot: &StateSnapshot) {
        self.snapshot = snapshot.clone();
    }

    /// Registry used to populate the controller picker.
    pub fn set_registry(&mut self, registry: &EntityRegistry) {
        self.registry = registry.clone();
    }

    #[must_use]
    pub const fn config(&self) -> &CardConfig {
        &self.config
    }

    /// Sensor entities offered by the manual entity pickers, sorted.
    #[must_use]
    pub fn entity_options(&self) -> Vec<String> {
        self.snapshot
            .entity_ids()
            .filter(|id| ENTITY_PREFIXES.iter().any(|prefix| id.starts_with(prefix)))
            .sorted()
            .map(str::to_string)
            .collect()
    }

    /// Classified devices, as `(device id, device name)`.
    #[must_use]
    pub fn controller_options(&self) -> Vec<(String, String)> {
        classify(&self.snapshot, &self.registry)
            .into_values()
            .map(|device| (device.id, device.name))
            .collect()
    }

    #[must_use]
    pub fn fields(&self) -> Vec<EditorField> {
        let config = &self.config;
        let text = |value: Option<&str>| value.map_or(Value::Null, |x| Value::String(x.to_string()));

        let mut controllers = vec![(String::new(), "Auto (first found)".to_string())];
        controllers.extend(self.controller_options());

        let mut fields = vec![
            EditorField {
                key: "title",
                label: "Title",
                kind: FieldKind::Text,
                value: Value::String(config.title.clone()),
            },
            EditorField {
                key: "auto_detect",
                label: "Auto-detect AC Infinity devices",
                kind: FieldKind::Toggle,
                value: Value::Bool(config.auto_detect),
            },
            EditorField {
                key: "show_ports",
                label: "Show ports",
                kind: FieldKind::Toggle,
                value: Value::Bool(config.show_ports),
            },
            EditorField {
                key: "show_sensors",
                label: "Show sensors",
                kind: FieldKind::Toggle,
                value: Value::Bool(config.show_sensors),
            },
            EditorField {
                key: "device_type",
                label: "Device type",
                kind: FieldKind::Select {
                    options: vec![
                        ("auto".into(), "Auto".into()),
                        ("controller".into(), "Controller".into()),
                        ("outlet".into(), "Outlet".into()),
                    ],
                },
                value: serde_json::to_value(config.device_type).unwrap_or(Value::Null),
            },
            EditorField {
                key: "selected_controller",
                label: "Controller",
                kind: FieldKind::Select {
                    options: controllers,
                },
                value: text(config.selected_controller.as_deref()),
            },
        ];

        let entities = self.entity_options();
        fields.extend(ReadingSlot::ALL.into_iter().map(|slot| EditorField {
            key: slot.config_key(),
            label: slot.label(),
            kind: FieldKind::EntityPicker {
                options: entities.clone(),
            },
            value: text(config.entity_override(slot)),
        }));

        fields
    }

    fn check_value(key: &str, value: &Value) -> CardResult<()> {
        let is_entity = ReadingSlot::ALL.iter().any(|slot| slot.config_key() == key);

        if Self::TOGGLE_FIELDS.contains(&key) {
            if !value.is_boolean() {
                return Err(CardError::invalid_value(key, "expected true or false"));
            }
        } else if Self::TEXT_FIELDS.contains(&key) || is_entity || key == "selected_controller" {
            if !(value.is_string() || value.is_null()) {
                return Err(CardError::invalid_value(key, "expected text"));
            }
        } else if key == "device_type" {
            if serde_json::from_value::<DeviceTypeOverride>(value.clone()).is_err() {
                return Err(CardError::invalid_value(
                    key,
                    "expected auto, controller or outlet",
                ));
            }
        } else {
            return Err(CardError::UnknownField(key.to_string()));
        }
        Ok(())
    }

    /// Apply one field edit, returning the event that hands the new
    /// configuration to the host.
    pub fn value_changed(&mut self, key: &str, value: Value) -> CardResult<CardEvent> {
        Self::check_value(key, &value)?;

        let config = self.config.merged(key, value)?;
        log::debug!("Editor field {key:?} changed");
        self.config = config.clone();

        Ok(CardEvent::ConfigChanged { config })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use acinfinity::{EntityRegistry, HassState, StateSnapshot};
    use acinfinity_api::config::{CardConfig, DeviceTypeOverride};
    use acinfinity_api::error::CardError;
    use acinfinity_api::event::CardEvent;

    use crate::editor::{Editor, FieldKind};

    fn snapshot() -> StateSnapshot {
        [
            "switch.tent_port_1",
            "sensor.zone_humidity",
            "binary_sensor.door",
            "sensor.a_temperature",
            "light.kitchen",
        ]
        .into_iter()
        .map(|id| (id.to_string(), HassState::new("1")))
        .collect()
    }

    #[test]
    fn entity_options_are_sensors_sorted() {
        let mut editor = Editor::new();
        editor.set_hass(&snapshot());
        assert_eq!(
            editor.entity_options(),
            [
                "binary_sensor.door",
                "sensor.a_temperature",
                "sensor.zone_humidity"
            ]
        );
    }

    #[test]
    fn edits_never_touch_the_given_config() {
        let original = CardConfig::from_value(&json!({"title": "Tent"})).unwrap();
        let mut editor = Editor::new();
        editor.set_config(&original);

        let CardEvent::ConfigChanged { config } =
            editor.value_changed("show_ports", json!(false)).unwrap()
        else {
            panic!("expected config-changed");
        };

        assert!(original.show_ports);
        assert!(!config.show_ports);
        assert_eq!(config.title, "Tent");
        assert_eq!(editor.config(), &config);

        let CardEvent::ConfigChanged { config } = editor
            .value_changed("probe_temp_entity", json!("sensor.a_temperature"))
            .unwrap()
        else {
            panic!("expected config-changed");
        };
        assert!(!config.show_ports);
        assert_eq!(
            config.probe_temp_entity.as_deref(),
            Some("sensor.a_temperature")
        );
    }

    #[test]
    fn device_type_select() {
        let mut editor = Editor::new();
        let event = editor.value_changed("device_type", json!("outlet")).unwrap();
        assert!(matches!(
            event,
            CardEvent::ConfigChanged { config } if config.device_type == DeviceTypeOverride::Outlet
        ));
        assert!(matches!(
            editor.value_changed("device_type", json!("toaster")),
            Err(CardError::InvalidFieldValue { .. })
        ));
    }

    #[test]
    fn bad_edits_are_rejected() {
        let mut editor = Editor::new();
        assert!(matches!(
            editor.value_changed("colour", json!("red")),
            Err(CardError::UnknownField(_))
        ));
        assert!(matches!(
            editor.value_changed("auto_detect", json!("yes")),
            Err(CardError::InvalidFieldValue { .. })
        ));
        assert_eq!(editor.config(), &CardConfig::default());
    }

    #[test]
    fn fields_cover_every_option() {
        let mut registry = EntityRegistry::new();
        registry.insert("sensor.a_temperature", "ac_infinity");

        let mut editor = Editor::new();
        editor.set_hass(&snapshot());
        editor.set_registry(&registry);

        let fields = editor.fields();
        let keys: Vec<&str> = fields.iter().map(|field| field.key).collect();
        assert_eq!(
            keys,
            [
                "title",
                "auto_detect",
                "show_ports",
                "show_sensors",
                "device_type",
                "selected_controller",
                "probe_temp_entity",
                "probe_humidity_entity",
                "probe_vpd_entity",
                "controller_temp_entity",
                "controller_humidity_entity",
                "controller_vpd_entity",
                "moisture_entity",
                "co2_entity",
                "uv_entity",
            ]
        );
        assert_eq!(fields[0].value, json!("AC Infinity Controller"));
        assert_eq!(fields[4].value, json!("auto"));

        let FieldKind::Select { options } = &fields[5].kind else {
            panic!("expected controller select");
        };
        assert_eq!(options.len(), 2);
        assert_eq!(options[1].0, "default");

        let FieldKind::EntityPicker { options } = &fields[6].kind else {
            panic!("expected entity picker");
        };
        assert_eq!(options.len(), 3);
    }
}
