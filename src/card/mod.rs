pub mod clock;
pub mod display;

use std::fmt::Display;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use serde_json::{Value, json};

use acinfinity::{Device, Devices, EntityRegistry, StateSnapshot, classify};
use acinfinity_api::config::CardConfig;
use acinfinity_api::error::{CardError, CardResult};
use acinfinity_api::event::CardEvent;

use crate::card::clock::{ClockTicker, format_clock};
use crate::card::display::{ClickTarget, DisplayModel};
use crate::editor::Editor;

/// The controller card: owns its configuration, the last snapshot it was
/// given and the devices classified from it.
#[derive(Debug, Default)]
pub struct Card {
    config: CardConfig,
    snapshot: StateSnapshot,
    registry: EntityRegistry,
    devices: Devices,
    ticker: ClockTicker,
}

impl Card {
    /// Nominal height of the card, in host layout units.
    pub const CARD_SIZE: u32 = 5;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh the clock every `period` instead of once a minute.
    #[must_use]
    pub fn with_clock_period(mut self, period: Duration) -> Self {
        self.ticker = ClockTicker::new(period);
        self
    }

    #[must_use]
    pub const fn card_size(&self) -> u32 {
        Self::CARD_SIZE
    }

    /// Companion editor for this card type.
    #[must_use]
    pub fn config_element() -> Editor {
        Editor::new()
    }

    /// Configuration offered when a user first adds the card.
    #[must_use]
    pub fn stub_config() -> Value {
        json!({
            "title": CardConfig::DEFAULT_TITLE,
            "auto_detect": true,
            "show_ports": true,
        })
    }

    /// Apply a configuration from the host. A missing or non-object
    /// configuration is rejected and the previous one stays in effect.
    pub fn set_config(&mut self, config: Option<&Value>) -> CardResult<()> {
        let config = CardConfig::from_value(config.ok_or(CardError::InvalidConfiguration)?)?;
        self.config = config;
        self.refresh();
        Ok(())
    }

    pub fn set_hass(&mut self, snapshot: StateSnapshot, registry: EntityRegistry) {
        self.snapshot = snapshot;
        self.registry = registry;
        self.refresh();
    }

    fn refresh(&mut self) {
        self.devices = if self.config.auto_detect {
            classify(&self.snapshot, &self.registry)
        } else {
            Devices::new()
        };
    }

    #[must_use]
    pub const fn config(&self) -> &CardConfig {
        &self.config
    }

    #[must_use]
    pub const fn devices(&self) -> &Devices {
        &self.devices
    }

    #[must_use]
    pub const fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    /// The device the card shows: the configured controller, else the first
    /// classified device, else one built from the manual entity overrides.
    #[must_use]
    pub fn selected_device(&self) -> Option<Device> {
        let selected = self
            .config
            .selected_controller
            .as_deref()
            .and_then(|id| {
                let device = self.devices.get(id);
                if device.is_none() {
                    log::debug!("Selected controller {id:?} not found, using first device");
                }
                device
            })
            .or_else(|| self.devices.values().next())
            .cloned()
            .or_else(|| self.config.manual_device());

        selected.map(|mut device| {
            device.device_type = self.config.device_type.apply(device.device_type);
            device
        })
    }

    pub fn display_model_at<Tz>(&self, now: &DateTime<Tz>) -> DisplayModel
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let device = self.selected_device();
        DisplayModel::build(&self.config, device.as_ref(), &self.snapshot, format_clock(now))
    }

    #[must_use]
    pub fn display_model(&self) -> DisplayModel {
        self.display_model_at(&Local::now())
    }

    /// Detail request for a click on `target`, if it is bound to an existing entity.
    #[must_use]
    pub fn click(&self, target: ClickTarget) -> Option<CardEvent> {
        let model = self.display_model();
        let event = model.entity_for(target).map(CardEvent::more_info);
        if event.is_none() {
            log::trace!("Click on unbound {target:?} ignored");
        }
        event
    }

    /// Attached to the display: start refreshing the clock.
    pub fn connected<F>(&mut self, on_tick: F) -> CardResult<bool>
    where
        F: FnMut() + Send + 'static,
    {
        self.ticker.start(on_tick)
    }

    /// Detached from the display: stop refreshing the clock.
    pub fn disconnected(&mut self) -> bool {
        self.ticker.stop()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.ticker.is_running()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use acinfinity::{DeviceType, EntityRegistry, HassState, StateSnapshot};
    use acinfinity_api::config::ReadingSlot;
    use acinfinity_api::error::CardError;
    use acinfinity_api::event::CardEvent;

    use crate::card::Card;
    use crate::card::display::ClickTarget;

    fn tent_a() -> (StateSnapshot, EntityRegistry) {
        let mut snapshot = StateSnapshot::new();
        snapshot.insert(
            "sensor.tent_a_tent_temperature",
            HassState::new("74.2")
                .with_device_id("dev1")
                .with_friendly_name("Tent A Tent Temperature"),
        );
        snapshot.insert(
            "switch.tent_a_port_1_state",
            HassState::new("on").with_device_id("dev1"),
        );

        let mut registry = EntityRegistry::new();
        registry.insert("sensor.tent_a_tent_temperature", "ac_infinity");
        registry.insert("switch.tent_a_port_1_state", "ac_infinity");
        (snapshot, registry)
    }

    #[test]
    fn missing_config_is_rejected() {
        let mut card = Card::new();
        assert!(matches!(
            card.set_config(None),
            Err(CardError::InvalidConfiguration)
        ));
        assert!(matches!(
            card.set_config(Some(&json!(null))),
            Err(CardError::InvalidConfiguration)
        ));
        assert!(card.set_config(Some(&json!({"title": "Tent"}))).is_ok());
        assert_eq!(card.config().title, "Tent");
    }

    #[test]
    fn tent_a_renders_probe_temperature_and_port() {
        let (snapshot, registry) = tent_a();
        let mut card = Card::new();
        card.set_config(Some(&json!({}))).unwrap();
        card.set_hass(snapshot, registry);

        let dev = &card.devices()["dev1"];
        assert_eq!(
            dev.probe_temperature.as_deref(),
            Some("sensor.tent_a_tent_temperature")
        );
        assert_eq!(
            dev.ports[&1].state.as_deref(),
            Some("switch.tent_a_port_1_state")
        );

        let now = Utc.with_ymd_and_hms(2024, 5, 1, 14, 7, 0).unwrap();
        let dm = card.display_model_at(&now);
        assert!(!dm.loading);
        assert_eq!(dm.value(ReadingSlot::ProbeTemperature), "74");
        assert!(dm.ports[0].on);
        assert_eq!(dm.ports[0].value, "ON");
        assert_eq!(dm.ports.len(), 8);
        assert_eq!(dm.clock, "2:07 PM");
        assert_eq!(dm.device_type, DeviceType::Controller);

        assert_eq!(
            card.click(ClickTarget::Reading(ReadingSlot::ProbeTemperature)),
            Some(CardEvent::more_info("sensor.tent_a_tent_temperature"))
        );
        assert_eq!(
            card.click(ClickTarget::Settings),
            Some(CardEvent::more_info("sensor.tent_a_tent_temperature"))
        );
        assert_eq!(
            card.click(ClickTarget::Port(1)),
            Some(CardEvent::more_info("switch.tent_a_port_1_state"))
        );
        assert_eq!(card.click(ClickTarget::Port(2)), None);
    }

    #[test]
    fn manual_entity_without_state_is_placeholder() {
        let mut card = Card::new();
        card.set_config(Some(&json!({
            "auto_detect": false,
            "probe_temp_entity": "sensor.custom_temp",
        })))
        .unwrap();
        let (snapshot, registry) = tent_a();
        card.set_hass(snapshot, registry);

        assert!(card.devices().is_empty());
        let dm = card.display_model();
        assert!(!dm.loading);
        assert_eq!(dm.value(ReadingSlot::ProbeTemperature), "--");
        assert_eq!(
            card.click(ClickTarget::Reading(ReadingSlot::ProbeTemperature)),
            None
        );
        assert_eq!(card.click(ClickTarget::Settings), None);
    }

    #[test]
    fn selection_and_type_override() {
        let mut snapshot = StateSnapshot::new();
        for (id, dev) in [("sensor.a_temperature", "dev_a"), ("sensor.b_temperature", "dev_b")] {
            snapshot.insert(
                id,
                HassState::new("70")
                    .with_device_id(dev)
                    .with_integration("ac_infinity"),
            );
        }

        let mut card = Card::new();
        card.set_hass(snapshot, EntityRegistry::new());
        assert_eq!(card.selected_device().unwrap().id, "dev_a");

        card.set_config(Some(&json!({
            "selected_controller": "dev_b",
            "device_type": "outlet",
        })))
        .unwrap();
        let dev = card.selected_device().unwrap();
        assert_eq!(dev.id, "dev_b");
        assert_eq!(dev.device_type, DeviceType::Outlet);

        card.set_config(Some(&json!({"selected_controller": "gone"})))
            .unwrap();
        assert_eq!(card.selected_device().unwrap().id, "dev_a");
    }

    #[test]
    fn empty_snapshot_is_loading() {
        let card = Card::new();
        let dm = card.display_model();
        assert!(dm.loading);
        assert_eq!(dm.ports.len(), 8);
        assert_eq!(card.click(ClickTarget::Settings), None);
    }

    #[test]
    fn static_metadata() {
        let card = Card::new();
        assert_eq!(card.card_size(), 5);
        assert_eq!(
            Card::stub_config(),
            json!({"title": "AC Infinity Controller", "auto_detect": true, "show_ports": true})
        );
        let editor = Card::config_element();
        assert!(editor.entity_options().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn clock_runs_while_connected() {
        let mut card = Card::new();
        assert!(card.connected(|| {}).unwrap());
        assert!(!card.connected(|| {}).unwrap());
        assert!(card.is_connected());
        assert!(card.disconnected());
        assert!(!card.is_connected());
        assert!(card.connected(|| {}).unwrap());
    }
}
