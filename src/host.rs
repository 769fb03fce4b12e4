use std::fs::File;
use std::time::Duration;

use camino::Utf8Path;
use serde::de::DeserializeOwned;
use serde_json::Value;

use acinfinity::{EntityRegistry, StateSnapshot};

use crate::card::Card;
use crate::config::AppConfig;
use crate::editor::Editor;
use crate::error::{ApiError, ApiResult};
use crate::registry::{CardDescriptor, CardRegistry};

/// Read a JSON or YAML document, chosen by file extension.
fn read_document<T: DeserializeOwned + 'static>(path: &Utf8Path) -> ApiResult<T> {
    let fd = File::open(path)?;
    match path.extension() {
        Some("yaml" | "yml") => Ok(serde_yml::from_reader(fd)?),
        _ => Ok(serde_json::from_reader(fd)?),
    }
}

pub fn load_snapshot(path: &Utf8Path) -> ApiResult<StateSnapshot> {
    if !path.is_file() {
        log::warn!("State file {path} not found, starting with no entities");
        return Ok(StateSnapshot::new());
    }
    let snapshot: StateSnapshot = read_document(path)?;
    log::debug!("Loaded {} entity states from {path}", snapshot.len());
    Ok(snapshot)
}

pub fn load_registry(path: Option<&Utf8Path>) -> ApiResult<EntityRegistry> {
    let Some(path) = path else {
        return Ok(EntityRegistry::new());
    };
    if !path.is_file() {
        log::warn!("Registry file {path} not found, using heuristics only");
        return Ok(EntityRegistry::new());
    }
    let registry = read_document(path)?;
    log::debug!("Loaded entity registry from {path}");
    Ok(registry)
}

/// Local stand-in for the dashboard host: feeds file-backed entity data and
/// the configured card settings into cards and editors.
#[derive(Debug)]
pub struct Host {
    config: AppConfig,
    cards: CardRegistry,
}

impl Host {
    pub fn new(config: AppConfig) -> ApiResult<Self> {
        let mut cards = CardRegistry::new();
        cards.register(CardDescriptor::ac_infinity())?;
        Ok(Self { config, cards })
    }

    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub const fn cards(&self) -> &CardRegistry {
        &self.cards
    }

    pub fn load(&self) -> ApiResult<(StateSnapshot, EntityRegistry)> {
        let host = &self.config.host;
        Ok((
            load_snapshot(&host.states_file)?,
            load_registry(host.registry_file.as_deref())?,
        ))
    }

    /// Card with the configured settings and current entity data.
    ///
    /// `controller` overrides `selected_controller`, and must name a
    /// classified device.
    pub fn card(&self, controller: Option<&str>) -> ApiResult<Card> {
        let mut settings = self.config.card.to_value()?;
        if let (Some(id), Value::Object(map)) = (controller, &mut settings) {
            map.insert("selected_controller".to_string(), id.into());
        }

        let period = Duration::from_secs(self.config.host.refresh_secs.max(1));
        let mut card = Card::new().with_clock_period(period);
        card.set_config(Some(&settings))?;
        self.refresh(&mut card)?;

        if let Some(id) = controller {
            if !card.devices().contains_key(id) {
                return Err(ApiError::ControllerNotFound(id.to_string()));
            }
        }
        Ok(card)
    }

    /// Reload entity data from disk into `card`.
    pub fn refresh(&self, card: &mut Card) -> ApiResult<()> {
        let (snapshot, registry) = self.load()?;
        card.set_hass(snapshot, registry);
        Ok(())
    }

    pub fn editor(&self) -> ApiResult<Editor> {
        let (snapshot, registry) = self.load()?;
        let mut editor = Card::config_element();
        editor.set_config(&self.config.card);
        editor.set_hass(&snapshot);
        editor.set_registry(&registry);
        Ok(editor)
    }
}
