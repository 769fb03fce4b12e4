use std::fmt::{self, Display, Write as _};

use serde::Serialize;

use acinfinity::format::parse_numeric;
use acinfinity::hass::MISSING_STATE;
use acinfinity::{Device, DeviceType, PLACEHOLDER, Port, StateSnapshot, format_value};
use acinfinity_api::config::{CardConfig, ReadingSlot};

/// Port status reported by the controller for a running port.
pub const STATUS_ACTIVE: &str = "Active";
pub const DEFAULT_MODE: &str = "AUTO";

const POWER_OFF: &[&str] = &["0", "off", "unavailable", "unknown", MISSING_STATE];

#[must_use]
pub const fn decimals(slot: ReadingSlot) -> usize {
    match slot {
        ReadingSlot::ProbeVpd => 2,
        ReadingSlot::ControllerVpd | ReadingSlot::Uv => 1,
        ReadingSlot::ProbeTemperature
        | ReadingSlot::ProbeHumidity
        | ReadingSlot::ControllerTemperature
        | ReadingSlot::ControllerHumidity
        | ReadingSlot::Moisture
        | ReadingSlot::Co2 => 0,
    }
}

#[must_use]
pub const fn default_unit(slot: ReadingSlot) -> &'static str {
    match slot {
        ReadingSlot::ProbeTemperature | ReadingSlot::ControllerTemperature => "°F",
        ReadingSlot::ProbeHumidity | ReadingSlot::ControllerHumidity | ReadingSlot::Moisture => {
            "%"
        }
        ReadingSlot::ProbeVpd | ReadingSlot::ControllerVpd => "kPa",
        ReadingSlot::Co2 => "ppm",
        ReadingSlot::Uv => "UV",
    }
}

/// Something on the card face the user can click.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClickTarget {
    Reading(ReadingSlot),
    Port(u32),
    Settings,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Reading {
    pub slot: ReadingSlot,
    pub value: String,
    pub unit: String,
    /// Set only when the bound entity exists in the snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

impl Reading {
    fn new(slot: ReadingSlot, device: &Device, snapshot: &StateSnapshot) -> Self {
        let entity_id = slot.entity(device);
        let resolved = snapshot.resolve(entity_id);
        let unit = snapshot
            .attributes_of(resolved)
            .and_then(|attrs| attrs.unit_of_measurement.as_deref())
            .filter(|unit| !unit.is_empty())
            .unwrap_or_else(|| default_unit(slot));

        Self {
            slot,
            value: format_value(resolved.map(|id| snapshot.state_of(Some(id))), decimals(slot)),
            unit: unit.to_string(),
            entity_id: resolved.map(str::to_string),
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct PortRow {
    pub number: u32,
    pub name: String,
    pub on: bool,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

fn power_is_on(raw: &str) -> bool {
    !POWER_OFF.contains(&raw.trim()) && parse_numeric(raw) != Some(0.0)
}

impl PortRow {
    fn new(port: &Port, snapshot: &StateSnapshot) -> Self {
        let status = snapshot.state_of(port.status.as_deref());
        let state = snapshot.state_of(port.state.as_deref());
        let power = port.power.as_deref().map(|id| snapshot.state_of(Some(id)));

        let on = status == STATUS_ACTIVE || state == "on" || power.is_some_and(power_is_on);

        let value = match (on, power) {
            (true, Some(power)) => format_value(Some(power), 0),
            (true, None) => "ON".to_string(),
            (false, _) => "OFF".to_string(),
        };

        let mode = port
            .mode
            .as_deref()
            .and_then(|id| snapshot.get(id))
            .filter(|mode| mode.is_available())
            .map(|mode| mode.state.to_uppercase());

        Self {
            number: port.number,
            name: port.name.clone(),
            on,
            value,
            mode,
            entity_id: snapshot.resolve(port.primary_entity()).map(str::to_string),
        }
    }
}

/// Everything the card face shows, computed from one configuration and one snapshot.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct DisplayModel {
    pub title: String,
    /// No device could be selected yet.
    pub loading: bool,
    pub device_id: String,
    pub device_name: String,
    pub device_type: DeviceType,
    pub show_ports: bool,
    pub show_sensors: bool,
    pub readings: Vec<Reading>,
    pub ports: Vec<PortRow>,
    pub mode: String,
    pub clock: String,
}

impl DisplayModel {
    #[must_use]
    pub fn build(
        config: &CardConfig,
        device: Option<&Device>,
        snapshot: &StateSnapshot,
        clock: String,
    ) -> Self {
        let placeholder = Device::default();
        let loading = device.is_none();
        let device = device.unwrap_or(&placeholder);

        let readings = ReadingSlot::ALL
            .into_iter()
            .map(|slot| Reading::new(slot, device, snapshot))
            .collect();

        let ports: Vec<PortRow> = device
            .display_ports()
            .iter()
            .map(|port| PortRow::new(port, snapshot))
            .collect();

        let mode = ports
            .iter()
            .filter(|row| row.on)
            .find_map(|row| row.mode.clone())
            .unwrap_or_else(|| DEFAULT_MODE.to_string());

        Self {
            title: config.title.clone(),
            loading,
            device_id: device.id.clone(),
            device_name: device.name.clone(),
            device_type: device.device_type,
            show_ports: config.show_ports,
            show_sensors: config.show_sensors,
            readings,
            ports,
            mode,
            clock,
        }
    }

    #[must_use]
    pub fn reading(&self, slot: ReadingSlot) -> Option<&Reading> {
        self.readings.iter().find(|reading| reading.slot == slot)
    }

    #[must_use]
    pub fn port(&self, number: u32) -> Option<&PortRow> {
        self.ports.iter().find(|row| row.number == number)
    }

    /// Formatted value of a reading, or [`PLACEHOLDER`].
    #[must_use]
    pub fn value(&self, slot: ReadingSlot) -> &str {
        self.reading(slot)
            .map_or(PLACEHOLDER, |reading| reading.value.as_str())
    }

    /// Entity the settings button opens: the primary (probe) temperature.
    #[must_use]
    pub fn settings_entity(&self) -> Option<&str> {
        self.reading(ReadingSlot::ProbeTemperature)
            .and_then(|reading| reading.entity_id.as_deref())
    }

    /// Entity shown in the detail dialog when `target` is clicked.
    #[must_use]
    pub fn entity_for(&self, target: ClickTarget) -> Option<&str> {
        match target {
            ClickTarget::Reading(slot) => self
                .reading(slot)
                .and_then(|reading| reading.entity_id.as_deref()),
            ClickTarget::Port(number) => self.port(number).and_then(|row| row.entity_id.as_deref()),
            ClickTarget::Settings => self.settings_entity(),
        }
    }
}

impl Display for DisplayModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut header = format!("{}  [{}]", self.title, self.clock);
        if self.loading {
            header.push_str("  (loading)");
        } else {
            write!(header, "  {} ({:?})", self.device_name, self.device_type)?;
        }
        writeln!(f, "{header}")?;
        writeln!(f, "{}", "-".repeat(header.chars().count()))?;

        let temp = self.reading(ReadingSlot::ProbeTemperature);
        if let Some(temp) = temp {
            writeln!(f, "{:>8}{}   {}", temp.value, temp.unit, self.mode)?;
        }

        if self.show_sensors {
            for reading in self.readings.iter().skip(1) {
                writeln!(
                    f,
                    "  {:<24} {:>6} {}",
                    reading.slot.label(),
                    reading.value,
                    reading.unit
                )?;
            }
        }

        if self.show_ports {
            for row in &self.ports {
                writeln!(
                    f,
                    "  {} {:<20} {:>5}{}",
                    row.number,
                    row.name,
                    row.value,
                    row.mode
                        .as_deref()
                        .map(|mode| format!("  {mode}"))
                        .unwrap_or_default()
                )?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use acinfinity::{Device, HassState, Port, StateSnapshot};
    use acinfinity_api::config::{CardConfig, ReadingSlot};

    use crate::card::display::{ClickTarget, DEFAULT_MODE, DisplayModel, decimals};

    fn model(device: Option<&Device>, snapshot: &StateSnapshot) -> DisplayModel {
        DisplayModel::build(&CardConfig::default(), device, snapshot, "9:05 AM".into())
    }

    fn port(number: u32) -> Port {
        Port::new(number, format!("Port {number}"))
    }

    #[test]
    fn placeholder_device_is_loading() {
        let dm = model(None, &StateSnapshot::new());
        assert!(dm.loading);
        assert_eq!(dm.ports.len(), 8);
        assert!(dm.ports.iter().all(|row| !row.on && row.value == "OFF"));
        assert!(dm.readings.iter().all(|reading| reading.value == "--"));
        assert_eq!(dm.mode, DEFAULT_MODE);
        assert_eq!(dm.entity_for(ClickTarget::Settings), None);
    }

    #[test]
    fn readings_use_slot_precision_and_units() {
        let mut dev = Device::new("dev1", "Tent");
        dev.probe_vpd = Some("sensor.vpd".into());
        dev.controller_vpd = Some("sensor.ctrl_vpd".into());
        dev.co2 = Some("sensor.co2".into());
        dev.probe_temperature = Some("sensor.temp".into());

        let mut snapshot = StateSnapshot::new();
        snapshot.insert("sensor.vpd", HassState::new("1.2"));
        snapshot.insert("sensor.ctrl_vpd", HassState::new("0.84"));
        snapshot.insert("sensor.co2", HassState::new("812.6").with_unit("ppm"));
        snapshot.insert("sensor.temp", HassState::new("23.5").with_unit("°C"));

        let dm = model(Some(&dev), &snapshot);
        assert_eq!(dm.value(ReadingSlot::ProbeVpd), "1.20");
        assert_eq!(dm.value(ReadingSlot::ControllerVpd), "0.8");
        assert_eq!(dm.value(ReadingSlot::Co2), "813");
        assert_eq!(dm.value(ReadingSlot::ProbeTemperature), "24");
        assert_eq!(dm.reading(ReadingSlot::ProbeTemperature).unwrap().unit, "°C");
        assert_eq!(dm.reading(ReadingSlot::ProbeVpd).unwrap().unit, "kPa");
        assert_eq!(decimals(ReadingSlot::Uv), 1);
    }

    #[test]
    fn port_on_rules() {
        let mut dev = Device::new("dev1", "Tent");

        let mut by_status = port(1);
        by_status.status = Some("sensor.p1_status".into());
        let mut by_state = port(2);
        by_state.state = Some("switch.p2".into());
        let mut by_power = port(3);
        by_power.power = Some("sensor.p3_power".into());
        let mut zero_power = port(4);
        zero_power.power = Some("sensor.p4_power".into());
        let mut missing_power = port(5);
        missing_power.power = Some("sensor.p5_power".into());
        let mut off_state = port(6);
        off_state.state = Some("switch.p6".into());

        for p in [by_status, by_state, by_power, zero_power, missing_power, off_state] {
            dev.ports.insert(p.number, p);
        }

        let mut snapshot = StateSnapshot::new();
        snapshot.insert("sensor.p1_status", HassState::new("Active"));
        snapshot.insert("switch.p2", HassState::new("on"));
        snapshot.insert("sensor.p3_power", HassState::new("7"));
        snapshot.insert("sensor.p4_power", HassState::new("0.0"));
        snapshot.insert("switch.p6", HassState::new("off"));

        let dm = model(Some(&dev), &snapshot);
        let on: Vec<bool> = dm.ports.iter().map(|row| row.on).collect();
        assert_eq!(on, [true, true, true, false, false, false, false, false]);

        let values: Vec<&str> = dm.ports.iter().map(|row| row.value.as_str()).collect();
        assert_eq!(values[..4], ["ON", "ON", "7", "OFF"]);

        assert_eq!(dm.entity_for(ClickTarget::Port(2)), Some("switch.p2"));
        assert_eq!(dm.entity_for(ClickTarget::Port(5)), None);
        assert_eq!(dm.entity_for(ClickTarget::Port(8)), None);
    }

    #[test]
    fn mode_badge_follows_first_active_port() {
        let mut dev = Device::new("dev1", "Tent");
        let mut idle = port(1);
        idle.state = Some("switch.p1".into());
        idle.mode = Some("select.p1_mode".into());
        let mut running = port(2);
        running.state = Some("switch.p2".into());
        running.mode = Some("select.p2_mode".into());
        dev.ports.insert(1, idle);
        dev.ports.insert(2, running);

        let mut snapshot = StateSnapshot::new();
        snapshot.insert("switch.p1", HassState::new("off"));
        snapshot.insert("select.p1_mode", HassState::new("Off"));
        snapshot.insert("switch.p2", HassState::new("on"));
        snapshot.insert("select.p2_mode", HassState::new("Cycle"));

        let dm = model(Some(&dev), &snapshot);
        assert_eq!(dm.mode, "CYCLE");
        assert_eq!(dm.port(1).unwrap().mode.as_deref(), Some("OFF"));
    }

    #[test]
    fn text_rendering_lists_ports() {
        let dev = Device::new("dev1", "Tent");
        let text = model(Some(&dev), &StateSnapshot::new()).to_string();
        assert!(text.starts_with("AC Infinity Controller  [9:05 AM]  Tent"));
        assert!(text.contains("8 Port 8"));
    }
}
