use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};

use acinfinity_api::config::CardConfig;

/// Where the local host finds its entity data.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct HostConfig {
    pub states_file: Utf8PathBuf,
    #[serde(default)]
    pub registry_file: Option<Utf8PathBuf>,
    pub refresh_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub host: HostConfig,
    #[serde(default)]
    pub card: CardConfig,
}

pub fn parse(filename: &Utf8Path) -> Result<AppConfig, ConfigError> {
    let settings = Config::builder()
        .set_default("host.states_file", "states.json")?
        .set_default("host.refresh_secs", 60)?
        .add_source(config::File::with_name(filename.as_str()).required(false))
        .build()?;

    settings.try_deserialize()
}
