use serde::{Deserialize, Serialize};

use crate::config::CardConfig;

/// Events the card and its editor emit towards the host.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "detail")]
pub enum CardEvent {
    #[serde(rename = "hass-more-info")]
    MoreInfo {
        #[serde(rename = "entityId")]
        entity_id: String,
    },
    #[serde(rename = "config-changed")]
    ConfigChanged { config: CardConfig },
}

impl CardEvent {
    #[must_use]
    pub fn more_info(entity_id: impl Into<String>) -> Self {
        Self::MoreInfo {
            entity_id: entity_id.into(),
        }
    }

    /// The DOM event name the host listens for.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MoreInfo { .. } => "hass-more-info",
            Self::ConfigChanged { .. } => "config-changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::config::CardConfig;
    use crate::event::CardEvent;

    #[test]
    fn more_info_wire_format() {
        let event = CardEvent::more_info("sensor.tent_a_temperature");
        assert_eq!(event.name(), "hass-more-info");
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "hass-more-info",
                "detail": {"entityId": "sensor.tent_a_temperature"},
            })
        );
    }

    #[test]
    fn config_changed_carries_full_config() {
        let event = CardEvent::ConfigChanged {
            config: CardConfig::default(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "config-changed");
        assert_eq!(value["detail"]["config"]["title"], CardConfig::DEFAULT_TITLE);
        assert_eq!(value["detail"]["config"]["show_ports"], true);
    }
}
