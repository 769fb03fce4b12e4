use std::collections::BTreeMap;

use serde::Serialize;

use acinfinity_api::error::{CardError, CardResult};

/// What a host needs to list a custom card in its card picker.
#[derive(Clone, Debug, Serialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardDescriptor {
    #[serde(rename = "type")]
    pub card_type: String,
    pub name: String,
    pub description: String,
    pub preview: bool,
    #[serde(rename = "documentationURL")]
    pub documentation_url: String,
}

impl CardDescriptor {
    pub const CARD_TYPE: &'static str = "ac-infinity-card";
    pub const EDITOR_TYPE: &'static str = "ac-infinity-card-editor";

    /// Descriptor for the AC Infinity controller card.
    #[must_use]
    pub fn ac_infinity() -> Self {
        Self {
            card_type: Self::CARD_TYPE.to_string(),
            name: "AC Infinity Controller Card".to_string(),
            description: "Display AC Infinity controller interface".to_string(),
            preview: true,
            documentation_url: "https://github.com/JoshuaSeidel/hass-acinfinity-lovelace-card"
                .to_string(),
        }
    }
}

/// Cards known to a host, keyed by card type.
#[derive(Clone, Debug, Default)]
pub struct CardRegistry {
    cards: BTreeMap<String, CardDescriptor>,
}

impl CardRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: CardDescriptor) -> CardResult<()> {
        if self.cards.contains_key(&descriptor.card_type) {
            return Err(CardError::AlreadyRegistered(descriptor.card_type));
        }
        log::info!(
            "Registered card {:?} ({})",
            descriptor.card_type,
            descriptor.name
        );
        self.cards.insert(descriptor.card_type.clone(), descriptor);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardDescriptor> {
        self.cards.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use acinfinity_api::error::CardError;

    use crate::registry::{CardDescriptor, CardRegistry};

    #[test]
    fn register_once() {
        let mut registry = CardRegistry::new();
        registry.register(CardDescriptor::ac_infinity()).unwrap();
        assert_eq!(registry.len(), 1);

        let err = registry.register(CardDescriptor::ac_infinity()).unwrap_err();
        assert!(matches!(err, CardError::AlreadyRegistered(ref t) if t == "ac-infinity-card"));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.iter().map(|card| card.card_type.as_str()).collect::<Vec<_>>(),
            [CardDescriptor::CARD_TYPE]
        );
    }

    #[test]
    fn descriptor_wire_format() {
        let value = serde_json::to_value(CardDescriptor::ac_infinity()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "ac-infinity-card",
                "name": "AC Infinity Controller Card",
                "description": "Display AC Infinity controller interface",
                "preview": true,
                "documentationURL": "https://github.com/JoshuaSeidel/hass-acinfinity-lovelace-card",
            })
        );
    }
}
