use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Number of port rows shown on the controller face plate.
pub const DISPLAY_PORTS: u32 = 8;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Controller,
    Outlet,
    #[default]
    Unknown,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Temperature,
    Humidity,
    Vpd,
}

impl Measure {
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Vpd => "vpd",
        }
    }
}

/// Where a primary reading comes from: the remote probe or the controller itself.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SensorSource {
    Probe,
    Controller,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SensorRole {
    ProbeTemperature,
    ProbeHumidity,
    ProbeVpd,
    ControllerTemperature,
    ControllerHumidity,
    ControllerVpd,
}

impl SensorRole {
    pub const ALL: [Self; 6] = [
        Self::ProbeTemperature,
        Self::ProbeHumidity,
        Self::ProbeVpd,
        Self::ControllerTemperature,
        Self::ControllerHumidity,
        Self::ControllerVpd,
    ];

    #[must_use]
    pub const fn new(source: SensorSource, measure: Measure) -> Self {
        match (source, measure) {
            (SensorSource::Probe, Measure::Temperature) => Self::ProbeTemperature,
            (SensorSource::Probe, Measure::Humidity) => Self::ProbeHumidity,
            (SensorSource::Probe, Measure::Vpd) => Self::ProbeVpd,
            (SensorSource::Controller, Measure::Temperature) => Self::ControllerTemperature,
            (SensorSource::Controller, Measure::Humidity) => Self::ControllerHumidity,
            (SensorSource::Controller, Measure::Vpd) => Self::ControllerVpd,
        }
    }

    #[must_use]
    pub const fn measure(self) -> Measure {
        match self {
            Self::ProbeTemperature | Self::ControllerTemperature => Measure::Temperature,
            Self::ProbeHumidity | Self::ControllerHumidity => Measure::Humidity,
            Self::ProbeVpd | Self::ControllerVpd => Measure::Vpd,
        }
    }

    #[must_use]
    pub const fn source(self) -> SensorSource {
        match self {
            Self::ProbeTemperature | Self::ProbeHumidity | Self::ProbeVpd => SensorSource::Probe,
            Self::ControllerTemperature | Self::ControllerHumidity | Self::ControllerVpd => {
                SensorSource::Controller
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SpecialtyRole {
    Moisture,
    Co2,
    Uv,
}

impl SpecialtyRole {
    pub const ALL: [Self; 3] = [Self::Moisture, Self::Co2, Self::Uv];
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PortRole {
    State,
    Status,
    Power,
    Mode,
    DeviceType,
}

/// One switched port (or outlet) of a device. Every slot holds an entity id.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Port {
    pub number: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
}

impl Port {
    #[must_use]
    pub fn new(number: u32, name: impl Into<String>) -> Self {
        Self {
            number,
            name: name.into(),
            ..Self::default()
        }
    }

    /// Empty port row used when no entity exists for `number`.
    #[must_use]
    pub fn placeholder(number: u32) -> Self {
        Self::new(number, format!("Port {number}"))
    }

    #[must_use]
    pub fn slot(&self, role: PortRole) -> Option<&str> {
        match role {
            PortRole::State => self.state.as_deref(),
            PortRole::Status => self.status.as_deref(),
            PortRole::Power => self.power.as_deref(),
            PortRole::Mode => self.mode.as_deref(),
            PortRole::DeviceType => self.device_type.as_deref(),
        }
    }

    const fn slot_mut(&mut self, role: PortRole) -> &mut Option<String> {
        match role {
            PortRole::State => &mut self.state,
            PortRole::Status => &mut self.status,
            PortRole::Power => &mut self.power,
            PortRole::Mode => &mut self.mode,
            PortRole::DeviceType => &mut self.device_type,
        }
    }

    /// Bind `entity_id` to `role`, unless the slot is already taken.
    pub fn fill(&mut self, role: PortRole, entity_id: &str) -> bool {
        let slot = self.slot_mut(role);
        if slot.is_some() {
            return false;
        }
        *slot = Some(entity_id.to_string());
        true
    }

    /// Entity the port row links to when clicked.
    #[must_use]
    pub fn primary_entity(&self) -> Option<&str> {
        self.state
            .as_deref()
            .or(self.power.as_deref())
            .or(self.status.as_deref())
            .or(self.mode.as_deref())
    }
}

/// A physical unit, as inferred from the entities it exposes.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub device_type: DeviceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_temperature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_humidity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_vpd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_temperature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_humidity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_vpd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moisture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv: Option<String>,
    #[serde(default)]
    pub ports: BTreeMap<u32, Port>,
}

impl Device {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn sensor(&self, role: SensorRole) -> Option<&str> {
        match role {
            SensorRole::ProbeTemperature => self.probe_temperature.as_deref(),
            SensorRole::ProbeHumidity => self.probe_humidity.as_deref(),
            SensorRole::ProbeVpd => self.probe_vpd.as_deref(),
            SensorRole::ControllerTemperature => self.controller_temperature.as_deref(),
            SensorRole::ControllerHumidity => self.controller_humidity.as_deref(),
            SensorRole::ControllerVpd => self.controller_vpd.as_deref(),
        }
    }

    pub const fn sensor_mut(&mut self, role: SensorRole) -> &mut Option<String> {
        match role {
            SensorRole::ProbeTemperature => &mut self.probe_temperature,
            SensorRole::ProbeHumidity => &mut self.probe_humidity,
            SensorRole::ProbeVpd => &mut self.probe_vpd,
            SensorRole::ControllerTemperature => &mut self.controller_temperature,
            SensorRole::ControllerHumidity => &mut self.controller_humidity,
            SensorRole::ControllerVpd => &mut self.controller_vpd,
        }
    }

    #[must_use]
    pub fn specialty(&self, role: SpecialtyRole) -> Option<&str> {
        match role {
            SpecialtyRole::Moisture => self.moisture.as_deref(),
            SpecialtyRole::Co2 => self.co2.as_deref(),
            SpecialtyRole::Uv => self.uv.as_deref(),
        }
    }

    pub const fn specialty_mut(&mut self, role: SpecialtyRole) -> &mut Option<String> {
        match role {
            SpecialtyRole::Moisture => &mut self.moisture,
            SpecialtyRole::Co2 => &mut self.co2,
            SpecialtyRole::Uv => &mut self.uv,
        }
    }

    /// True when any primary slot, moisture or CO2 is bound. UV does not count.
    #[must_use]
    pub fn has_environment_sensor(&self) -> bool {
        SensorRole::ALL.iter().any(|role| self.sensor(*role).is_some())
            || self.moisture.is_some()
            || self.co2.is_some()
    }

    #[must_use]
    pub fn port(&self, number: u32) -> Option<&Port> {
        self.ports.get(&number)
    }

    /// The displayed port rows: `1..=8`, with placeholders for missing numbers.
    #[must_use]
    pub fn display_ports(&self) -> Vec<Port> {
        (1..=DISPLAY_PORTS)
            .map(|number| {
                self.port(number)
                    .cloned()
                    .unwrap_or_else(|| Port::placeholder(number))
            })
            .collect()
    }

    /// Every entity id bound anywhere in this device.
    pub fn entity_ids(&self) -> impl Iterator<Item = &str> {
        let sensors = SensorRole::ALL.into_iter().filter_map(|role| self.sensor(role));
        let specialty = SpecialtyRole::ALL
            .into_iter()
            .filter_map(|role| self.specialty(role));
        let ports = self.ports.values().flat_map(|port| {
            [
                PortRole::State,
                PortRole::Status,
                PortRole::Power,
                PortRole::Mode,
                PortRole::DeviceType,
            ]
            .into_iter()
            .filter_map(|role| port.slot(role))
        });
        sensors.chain(specialty).chain(ports)
    }
}

#[cfg(test)]
mod tests {
    use crate::device::{Device, Port, PortRole, SensorRole, SensorSource, Measure};

    #[test]
    fn port_slots_fill_once() {
        let mut port = Port::new(1, "Port 1");
        assert!(port.fill(PortRole::State, "switch.a"));
        assert!(!port.fill(PortRole::State, "switch.b"));
        assert_eq!(port.slot(PortRole::State), Some("switch.a"));
        assert_eq!(port.primary_entity(), Some("switch.a"));
    }

    #[test]
    fn sensor_roles_round_trip_source_and_measure() {
        for role in SensorRole::ALL {
            assert_eq!(SensorRole::new(role.source(), role.measure()), role);
        }
        assert_eq!(
            SensorRole::new(SensorSource::Controller, Measure::Vpd),
            SensorRole::ControllerVpd
        );
    }

    #[test]
    fn display_ports_always_has_eight_rows() {
        let mut dev = Device::new("dev1", "Tent");
        dev.ports.insert(3, Port::new(3, "Fan"));
        dev.ports.insert(11, Port::new(11, "Extra"));

        let rows = dev.display_ports();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[2].name, "Fan");
        assert_eq!(rows[0], Port::placeholder(1));
        assert_eq!(rows[7].number, 8);
    }

    #[test]
    fn uv_alone_is_not_environmental() {
        let mut dev = Device::new("dev1", "Tent");
        dev.uv = Some("sensor.uv".into());
        assert!(!dev.has_environment_sensor());
        dev.co2 = Some("sensor.co2".into());
        assert!(dev.has_environment_sensor());
    }
}
