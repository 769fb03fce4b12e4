use std::collections::{BTreeMap, HashSet};

use crate::device::{Device, DeviceType, Port};
use crate::hass::{EntityRegistry, HassState, StateSnapshot};
use crate::rules::{
    EntityFacts, NameKey, PORT_RULES, SENSOR_RULES, SPECIALTY_RULES, is_member,
};

/// Classified devices, keyed by device id.
pub type Devices = BTreeMap<String, Device>;

struct Member<'a> {
    key: String,
    facts: EntityFacts<'a>,
}

fn device_key(
    facts: &EntityFacts,
    state: &HassState,
    registry: &EntityRegistry,
) -> (String, Option<String>) {
    let derived = NameKey::derive(facts);
    let key = state
        .attributes
        .device_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .or_else(|| registry.device_id(facts.entity_id))
        .map_or(derived.key, str::to_string);
    (key, derived.name)
}

/// Infer what kind of hardware a classified device is.
#[must_use]
pub fn infer_device_type(device: &Device, snapshot: &StateSnapshot) -> DeviceType {
    if device.has_environment_sensor() {
        return DeviceType::Controller;
    }

    let name = device.name.to_lowercase();
    let reports_outlet = device.ports.values().any(|port| {
        port.device_type
            .as_deref()
            .and_then(|id| snapshot.get(id))
            .is_some_and(|state| state.state.to_lowercase().contains("outlet"))
    });
    if name.contains("outlet") || name.contains("plug") || reports_outlet {
        return DeviceType::Outlet;
    }

    if device.ports.is_empty() {
        DeviceType::Unknown
    } else {
        DeviceType::Controller
    }
}

/// Find all AC Infinity devices in a snapshot.
///
/// Runs from scratch on every call, and yields identical results for
/// identical input.
#[must_use]
pub fn classify(snapshot: &StateSnapshot, registry: &EntityRegistry) -> Devices {
    let mut devices = Devices::new();
    let mut members = Vec::new();

    for (entity_id, state) in snapshot {
        let facts = EntityFacts::new(entity_id, state);
        if !is_member(&facts, state, registry) {
            continue;
        }

        let (key, name) = device_key(&facts, state, registry);
        let device = devices
            .entry(key.clone())
            .or_insert_with(|| Device::new(key.clone(), String::new()));
        if device.name.is_empty() {
            if let Some(name) = name {
                device.name = name;
            }
        }

        members.push(Member { key, facts });
    }

    if members.is_empty() {
        log::debug!(
            "No AC Infinity entities among {} states, nothing to display",
            snapshot.len()
        );
        return devices;
    }

    /* Explicitly named readings first, so that a generic reading can never
     * take a slot an explicit one wants, whatever the entity order. */
    let mut claimed = HashSet::new();
    for member in &members {
        let Some(rule) = SENSOR_RULES
            .iter()
            .filter(|rule| rule.is_explicit())
            .find(|rule| rule.matches(&member.facts))
        else {
            continue;
        };
        claimed.insert(member.facts.entity_id);
        if let Some(device) = devices.get_mut(&member.key) {
            let slot = device.sensor_mut(rule.role);
            if slot.is_none() {
                *slot = Some(member.facts.entity_id.to_string());
            }
        }
    }

    for member in members
        .iter()
        .filter(|member| !claimed.contains(member.facts.entity_id))
    {
        let Some(device) = devices.get_mut(&member.key) else {
            continue;
        };
        for rule in SENSOR_RULES.iter().filter(|rule| !rule.is_explicit()) {
            let slot = device.sensor_mut(rule.role);
            if slot.is_none() && rule.matches(&member.facts) {
                *slot = Some(member.facts.entity_id.to_string());
                break;
            }
        }
    }

    for member in &members {
        let Some(device) = devices.get_mut(&member.key) else {
            continue;
        };

        for rule in SPECIALTY_RULES.iter().filter(|rule| rule.matches(&member.facts)) {
            device
                .specialty_mut(rule.role)
                .get_or_insert_with(|| member.facts.entity_id.to_string());
        }

        let Some(found) = member.facts.port.as_ref() else {
            continue;
        };
        let Some(rule) = PORT_RULES.iter().find(|rule| rule.matches(&member.facts)) else {
            continue;
        };
        let port = device.ports.entry(found.number).or_insert_with(|| {
            found.label.as_ref().map_or_else(
                || Port::placeholder(found.number),
                |label| Port::new(found.number, label.clone()),
            )
        });
        if !port.fill(rule.role, member.facts.entity_id) {
            log::trace!(
                "Port {} of {} already has a {:?} entity, ignoring {}",
                found.number,
                member.key,
                rule.role,
                member.facts.entity_id
            );
        }
    }

    for device in devices.values_mut() {
        if device.name.is_empty() {
            device.name.clone_from(&device.id);
        }
        device.device_type = infer_device_type(device, snapshot);
    }

    /* Grouping may create a device for an entity that then matched no rule */
    devices.retain(|_, device| device.entity_ids().next().is_some());

    log::debug!(
        "Classified {} AC Infinity entities into {} devices",
        members.len(),
        devices.len()
    );

    devices
}
