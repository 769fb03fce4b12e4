use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use acinfinity::{Device, DeviceType, SensorRole, SpecialtyRole};

use crate::error::{CardError, CardResult};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceTypeOverride {
    #[default]
    Auto,
    Controller,
    Outlet,
}

impl DeviceTypeOverride {
    #[must_use]
    pub const fn apply(self, detected: DeviceType) -> DeviceType {
        match self {
            Self::Auto => detected,
            Self::Controller => DeviceType::Controller,
            Self::Outlet => DeviceType::Outlet,
        }
    }
}

/// A display slot that can be bound to an entity, automatically or by hand.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReadingSlot {
    ProbeTemperature,
    ProbeHumidity,
    ProbeVpd,
    ControllerTemperature,
    ControllerHumidity,
    ControllerVpd,
    Moisture,
    Co2,
    Uv,
}

impl ReadingSlot {
    pub const ALL: [Self; 9] = [
        Self::ProbeTemperature,
        Self::ProbeHumidity,
        Self::ProbeVpd,
        Self::ControllerTemperature,
        Self::ControllerHumidity,
        Self::ControllerVpd,
        Self::Moisture,
        Self::Co2,
        Self::Uv,
    ];

    /// Configuration key holding the manual override for this slot.
    #[must_use]
    pub const fn config_key(self) -> &'static str {
        match self {
            Self::ProbeTemperature => "probe_temp_entity",
            Self::ProbeHumidity => "probe_humidity_entity",
            Self::ProbeVpd => "probe_vpd_entity",
            Self::ControllerTemperature => "controller_temp_entity",
            Self::ControllerHumidity => "controller_humidity_entity",
            Self::ControllerVpd => "controller_vpd_entity",
            Self::Moisture => "moisture_entity",
            Self::Co2 => "co2_entity",
            Self::Uv => "uv_entity",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ProbeTemperature => "Probe/Tent Temperature",
            Self::ProbeHumidity => "Probe/Tent Humidity",
            Self::ProbeVpd => "Probe/Tent VPD",
            Self::ControllerTemperature => "Controller Temperature",
            Self::ControllerHumidity => "Controller Humidity",
            Self::ControllerVpd => "Controller VPD",
            Self::Moisture => "Soil Moisture",
            Self::Co2 => "CO2",
            Self::Uv => "UV",
        }
    }

    /// Entity bound to this slot on a classified device.
    #[must_use]
    pub fn entity<'a>(self, device: &'a Device) -> Option<&'a str> {
        match self {
            Self::ProbeTemperature => device.sensor(SensorRole::ProbeTemperature),
            Self::ProbeHumidity => device.sensor(SensorRole::ProbeHumidity),
            Self::ProbeVpd => device.sensor(SensorRole::ProbeVpd),
            Self::ControllerTemperature => device.sensor(SensorRole::ControllerTemperature),
            Self::ControllerHumidity => device.sensor(SensorRole::ControllerHumidity),
            Self::ControllerVpd => device.sensor(SensorRole::ControllerVpd),
            Self::Moisture => device.specialty(SpecialtyRole::Moisture),
            Self::Co2 => device.specialty(SpecialtyRole::Co2),
            Self::Uv => device.specialty(SpecialtyRole::Uv),
        }
    }

    fn entity_mut(self, device: &mut Device) -> &mut Option<String> {
        match self {
            Self::ProbeTemperature => device.sensor_mut(SensorRole::ProbeTemperature),
            Self::ProbeHumidity => device.sensor_mut(SensorRole::ProbeHumidity),
            Self::ProbeVpd => device.sensor_mut(SensorRole::ProbeVpd),
            Self::ControllerTemperature => device.sensor_mut(SensorRole::ControllerTemperature),
            Self::ControllerHumidity => device.sensor_mut(SensorRole::ControllerHumidity),
            Self::ControllerVpd => device.sensor_mut(SensorRole::ControllerVpd),
            Self::Moisture => device.specialty_mut(SpecialtyRole::Moisture),
            Self::Co2 => device.specialty_mut(SpecialtyRole::Co2),
            Self::Uv => device.specialty_mut(SpecialtyRole::Uv),
        }
    }
}

/* The host hands over loosely typed YAML. Missing, null and empty values all
 * mean "not set", and only an explicit `false` turns a default-on flag off. */

fn title_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(title)) if !title.trim().is_empty() => title,
        Some(Value::Number(num)) => num.to_string(),
        _ => CardConfig::default_title(),
    })
}

fn flag_default_on<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(!matches!(
        Option::<Value>::deserialize(deserializer)?,
        Some(Value::Bool(false))
    ))
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text.trim().to_string()).filter(|x| !x.is_empty()),
        _ => None,
    })
}

fn device_type_or_auto<'de, D>(deserializer: D) -> Result<DeviceTypeOverride, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?.unwrap_or(Value::Null);
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Card configuration, as stored by the host.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CardConfig {
    #[serde(
        default = "CardConfig::default_title",
        deserialize_with = "title_or_default"
    )]
    pub title: String,
    #[serde(default = "CardConfig::default_on", deserialize_with = "flag_default_on")]
    pub auto_detect: bool,
    #[serde(default = "CardConfig::default_on", deserialize_with = "flag_default_on")]
    pub show_ports: bool,
    #[serde(default = "CardConfig::default_on", deserialize_with = "flag_default_on")]
    pub show_sensors: bool,
    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_controller: Option<String>,
    #[serde(default, deserialize_with = "device_type_or_auto")]
    pub device_type: DeviceTypeOverride,

    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub probe_temp_entity: Option<String>,
    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub probe_humidity_entity: Option<String>,
    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub probe_vpd_entity: Option<String>,
    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub controller_temp_entity: Option<String>,
    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub controller_humidity_entity: Option<String>,
    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub controller_vpd_entity: Option<String>,
    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub moisture_entity: Option<String>,
    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub co2_entity: Option<String>,
    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub uv_entity: Option<String>,

    /// Keys this card does not interpret, such as the host's `type`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            title: Self::default_title(),
            auto_detect: true,
            show_ports: true,
            show_sensors: true,
            selected_controller: None,
            device_type: DeviceTypeOverride::Auto,
            probe_temp_entity: None,
            probe_humidity_entity: None,
            probe_vpd_entity: None,
            controller_temp_entity: None,
            controller_humidity_entity: None,
            controller_vpd_entity: None,
            moisture_entity: None,
            co2_entity: None,
            uv_entity: None,
            extra: Map::new(),
        }
    }
}

impl CardConfig {
    pub const DEFAULT_TITLE: &'static str = "AC Infinity Controller";
    pub const MANUAL_DEVICE_ID: &'static str = "manual";

    fn default_title() -> String {
        Self::DEFAULT_TITLE.to_string()
    }

    const fn default_on() -> bool {
        true
    }

    /// Validate and parse a configuration handed over by the host.
    pub fn from_value(value: &Value) -> CardResult<Self> {
        if !value.is_object() {
            return Err(CardError::InvalidConfiguration);
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn to_value(&self) -> CardResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// A new configuration with `key` replaced, leaving `self` untouched.
    pub fn merged(&self, key: &str, value: Value) -> CardResult<Self> {
        let mut map = match self.to_value()? {
            Value::Object(map) => map,
            _ => return Err(CardError::InvalidConfiguration),
        };
        map.insert(key.to_string(), value);
        Self::from_value(&Value::Object(map))
    }

    #[must_use]
    pub fn entity_override(&self, slot: ReadingSlot) -> Option<&str> {
        match slot {
            ReadingSlot::ProbeTemperature => self.probe_temp_entity.as_deref(),
            ReadingSlot::ProbeHumidity => self.probe_humidity_entity.as_deref(),
            ReadingSlot::ProbeVpd => self.probe_vpd_entity.as_deref(),
            ReadingSlot::ControllerTemperature => self.controller_temp_entity.as_deref(),
            ReadingSlot::ControllerHumidity => self.controller_humidity_entity.as_deref(),
            ReadingSlot::ControllerVpd => self.controller_vpd_entity.as_deref(),
            ReadingSlot::Moisture => self.moisture_entity.as_deref(),
            ReadingSlot::Co2 => self.co2_entity.as_deref(),
            ReadingSlot::Uv => self.uv_entity.as_deref(),
        }
    }

    #[must_use]
    pub fn has_overrides(&self) -> bool {
        ReadingSlot::ALL
            .iter()
            .any(|slot| self.entity_override(*slot).is_some())
    }

    /// Device built directly from the manual entity overrides, if any are set.
    #[must_use]
    pub fn manual_device(&self) -> Option<Device> {
        if !self.has_overrides() {
            return None;
        }
        let mut device = Device::new(Self::MANUAL_DEVICE_ID, self.title.clone());
        for slot in ReadingSlot::ALL {
            *slot.entity_mut(&mut device) = self.entity_override(slot).map(str::to_string);
        }
        device.device_type = self.device_type.apply(DeviceType::Controller);
        Some(device)
    }
}
