//! Classification rules.
//!
//! Every decision the classifier makes is expressed as an ordered table of
//! rules below. The classifier only walks these tables; precedence is the
//! table order.

use std::sync::LazyLock;

use regex::Regex;

use crate::device::{Measure, PortRole, SensorRole, SensorSource, SpecialtyRole};
use crate::hass::{DOMAIN, EntityRegistry, HassState};

static PORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^a-z])((?:port|outlet)[\s_]*(\d+))").expect("port pattern must compile")
});

/// Words that identify entities of unrelated integrations sharing our vocabulary.
pub const EXCLUDED_WORDS: &[&str] = &[
    "import", "export", "billing", "grid", "cloud", "alexa", "google",
];

/// Words that suggest an entity belongs to an AC Infinity device, when no
/// stronger ownership signal exists.
pub const VOCABULARY: &[&str] = &[
    "tent_temperature",
    "tent_humidity",
    "tent_vpd",
    "probe_temperature",
    "probe_humidity",
    "probe_vpd",
    "controller_temperature",
    "controller_humidity",
    "controller_vpd",
    "built_in_",
    "co2",
    "carbon_dioxide",
    "moisture",
    "soil",
    "ultraviolet",
    "ac_infinity",
    "acinfinity",
];

/// Like [`VOCABULARY`], but only counted as whole words (`uv` must not hit
/// `curve`).
pub const VOCABULARY_WORDS: &[&str] = &["uv"];

const PROBE_PREFIXES: &[&str] = &["tent_", "probe_"];
const CONTROLLER_PREFIXES: &[&str] = &["controller_", "built_in_"];

pub const BOOLEAN_DOMAINS: &[&str] = &["switch", "binary_sensor", "input_boolean", "light", "fan"];
pub const NUMERIC_DOMAINS: &[&str] = &["sensor", "number", "input_number"];
pub const SELECT_DOMAINS: &[&str] = &["select", "input_select"];

/// A port token found in an entity id or friendly name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PortMatch {
    pub number: u32,
    /// Friendly name up to and including the port token, e.g. `Tent A Port 1`.
    pub label: Option<String>,
    /// Byte offset in the friendly name where the port token starts.
    pub name_offset: Option<usize>,
}

/// Lower-cased, pre-digested view of one entity, shared by every rule.
#[derive(Clone, Debug)]
pub struct EntityFacts<'a> {
    pub entity_id: &'a str,
    pub domain: &'a str,
    /// Entity id, lower-cased.
    pub id: String,
    /// Friendly name, lower-cased with every run of non-alphanumerics
    /// replaced by a single `_`, so `Built-in Temperature` reads
    /// `built_in_temperature`.
    pub name: String,
    pub friendly_name: Option<&'a str>,
    pub device_class: Option<String>,
    pub port: Option<PortMatch>,
}

fn normalize_name(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_sep = true;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_sep = false;
        } else if !last_sep {
            out.push('_');
            last_sep = true;
        }
    }
    out.trim_end_matches('_').to_string()
}

fn find_port(id: &str, friendly_name: Option<&str>) -> Option<PortMatch> {
    let from_name = friendly_name.and_then(|name| {
        let lower = name.to_ascii_lowercase();
        let caps = PORT_PATTERN.captures(&lower)?;
        let token = caps.get(1)?;
        let number = caps.get(2)?.as_str().parse().ok()?;
        Some(PortMatch {
            number,
            label: Some(name[..token.end()].trim().to_string()),
            name_offset: Some(token.start()),
        })
    });

    if let Some(caps) = PORT_PATTERN.captures(id) {
        if let Some(number) = caps.get(2).and_then(|m| m.as_str().parse().ok()) {
            return Some(PortMatch {
                number,
                label: from_name.as_ref().and_then(|m| m.label.clone()),
                name_offset: from_name.as_ref().and_then(|m| m.name_offset),
            });
        }
    }

    from_name
}

impl<'a> EntityFacts<'a> {
    #[must_use]
    pub fn new(entity_id: &'a str, state: &'a HassState) -> Self {
        let domain = entity_id.split_once('.').map_or("", |(domain, _)| domain);
        let id = entity_id.to_ascii_lowercase();
        let friendly_name = state
            .attributes
            .friendly_name
            .as_deref()
            .filter(|name| !name.trim().is_empty());
        let port = find_port(&id, friendly_name);

        Self {
            entity_id,
            domain,
            name: friendly_name.map(normalize_name).unwrap_or_default(),
            id,
            friendly_name,
            device_class: state
                .attributes
                .device_class
                .as_deref()
                .map(str::to_ascii_lowercase),
            port,
        }
    }

    #[must_use]
    pub fn mentions(&self, needle: &str) -> bool {
        self.id.contains(needle) || self.name.contains(needle)
    }

    #[must_use]
    pub fn mentions_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|needle| self.mentions(needle))
    }

    /// Like [`Self::mentions`], but `word` must not be part of a longer word.
    #[must_use]
    pub fn mentions_word(&self, word: &str) -> bool {
        [self.id.as_str(), self.name.as_str()].into_iter().any(|text| {
            text.match_indices(word).any(|(start, _)| {
                let end = start + word.len();
                !text[..start].ends_with(|c: char| c.is_ascii_alphabetic())
                    && !text[end..].starts_with(|c: char| c.is_ascii_alphabetic())
            })
        })
    }

    #[must_use]
    pub fn mentions_any_word(&self, words: &[&str]) -> bool {
        words.iter().any(|word| self.mentions_word(word))
    }

    #[must_use]
    pub fn mentions_port(&self) -> bool {
        self.port.is_some() || self.mentions("port")
    }

    fn mentions_prefixed(&self, prefixes: &[&str], measure: Measure) -> bool {
        prefixes
            .iter()
            .any(|prefix| self.mentions(&format!("{prefix}{}", measure.keyword())))
    }

    fn in_domain(&self, domains: &[&str]) -> bool {
        domains.contains(&self.domain)
    }
}

/// Decide whether an entity belongs to the integration.
///
/// The entity registry is authoritative when it knows the entity, then the
/// `integration` attribute. Only when neither is present do naming
/// heuristics apply.
#[must_use]
pub fn is_member(facts: &EntityFacts, state: &HassState, registry: &EntityRegistry) -> bool {
    if let Some(platform) = registry.platform(facts.entity_id) {
        return platform == DOMAIN;
    }

    if let Some(integration) = state.attributes.integration.as_deref() {
        return integration == DOMAIN;
    }

    if facts.mentions_any(EXCLUDED_WORDS) {
        return false;
    }

    facts.port.is_some()
        || facts.mentions_any(VOCABULARY)
        || facts.mentions_any_word(VOCABULARY_WORDS)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SensorRuleKind {
    /// Named explicitly as a probe/tent reading.
    Probe,
    /// Named explicitly as a controller/built-in reading.
    Controller,
    /// Generic reading, used for the probe slot when nothing better exists.
    Fallback,
}

#[derive(Clone, Copy, Debug)]
pub struct SensorRule {
    pub role: SensorRole,
    pub kind: SensorRuleKind,
}

impl SensorRule {
    const fn new(kind: SensorRuleKind, measure: Measure) -> Self {
        let source = match kind {
            SensorRuleKind::Probe | SensorRuleKind::Fallback => SensorSource::Probe,
            SensorRuleKind::Controller => SensorSource::Controller,
        };
        Self {
            role: SensorRole::new(source, measure),
            kind,
        }
    }

    #[must_use]
    pub const fn is_explicit(&self) -> bool {
        !matches!(self.kind, SensorRuleKind::Fallback)
    }

    /// Pattern match only. Slot occupancy is the classifier's concern.
    #[must_use]
    pub fn matches(&self, facts: &EntityFacts) -> bool {
        let measure = self.role.measure();
        match self.kind {
            SensorRuleKind::Probe => {
                facts.mentions_prefixed(PROBE_PREFIXES, measure)
                    || (measure != Measure::Vpd
                        && facts.device_class.as_deref() == Some(measure.keyword())
                        && facts.name.contains("tent"))
            }
            SensorRuleKind::Controller => {
                facts.mentions_prefixed(CONTROLLER_PREFIXES, measure) && !facts.mentions_port()
            }
            SensorRuleKind::Fallback => facts.mentions(measure.keyword()) && !facts.mentions_port(),
        }
    }
}

/// Primary sensor rules, in precedence order.
pub static SENSOR_RULES: [SensorRule; 9] = [
    SensorRule::new(SensorRuleKind::Probe, Measure::Temperature),
    SensorRule::new(SensorRuleKind::Probe, Measure::Humidity),
    SensorRule::new(SensorRuleKind::Probe, Measure::Vpd),
    SensorRule::new(SensorRuleKind::Controller, Measure::Temperature),
    SensorRule::new(SensorRuleKind::Controller, Measure::Humidity),
    SensorRule::new(SensorRuleKind::Controller, Measure::Vpd),
    SensorRule::new(SensorRuleKind::Fallback, Measure::Temperature),
    SensorRule::new(SensorRuleKind::Fallback, Measure::Humidity),
    SensorRule::new(SensorRuleKind::Fallback, Measure::Vpd),
];

#[derive(Clone, Copy, Debug)]
pub struct SpecialtyRule {
    pub role: SpecialtyRole,
    pub keywords: &'static [&'static str],
    /// Keywords that only count as whole words.
    pub words: &'static [&'static str],
}

impl SpecialtyRule {
    #[must_use]
    pub fn matches(&self, facts: &EntityFacts) -> bool {
        (facts.mentions_any(self.keywords) || facts.mentions_any_word(self.words))
            && !facts.mentions_port()
    }
}

pub static SPECIALTY_RULES: [SpecialtyRule; 3] = [
    SpecialtyRule {
        role: SpecialtyRole::Moisture,
        keywords: &["moisture", "soil"],
        words: &[],
    },
    SpecialtyRule {
        role: SpecialtyRole::Co2,
        keywords: &["co2", "carbon_dioxide"],
        words: &[],
    },
    SpecialtyRule {
        role: SpecialtyRole::Uv,
        keywords: &["ultraviolet"],
        words: &["uv"],
    },
];

#[derive(Clone, Copy, Debug)]
pub struct PortRule {
    pub role: PortRole,
    /// Domains the entity must live in. Empty means any domain.
    pub domains: &'static [&'static str],
    /// Keywords the entity must mention. Empty means none required.
    pub keywords: &'static [&'static str],
    /// Accept a domain match or a keyword match, instead of requiring both.
    pub either: bool,
}

impl PortRule {
    #[must_use]
    pub fn matches(&self, facts: &EntityFacts) -> bool {
        let by_domain = !self.domains.is_empty() && facts.in_domain(self.domains);
        let by_keyword = !self.keywords.is_empty() && facts.mentions_any(self.keywords);
        if self.either {
            by_domain || by_keyword
        } else {
            (self.domains.is_empty() || by_domain) && (self.keywords.is_empty() || by_keyword)
        }
    }
}

/// Port sub-role rules, in precedence order.
pub static PORT_RULES: [PortRule; 6] = [
    PortRule {
        role: PortRole::Status,
        domains: &[],
        keywords: &["status"],
        either: false,
    },
    PortRule {
        role: PortRole::DeviceType,
        domains: &[],
        keywords: &["device_type", "connected_device"],
        either: false,
    },
    PortRule {
        role: PortRole::State,
        domains: BOOLEAN_DOMAINS,
        keywords: &[],
        either: false,
    },
    PortRule {
        role: PortRole::Power,
        domains: NUMERIC_DOMAINS,
        keywords: &["current_power", "power", "speed", "speak"],
        either: false,
    },
    PortRule {
        role: PortRole::Mode,
        domains: SELECT_DOMAINS,
        keywords: &["mode"],
        either: true,
    },
    PortRule {
        role: PortRole::State,
        domains: &[],
        keywords: &["state"],
        either: false,
    },
];

/// Device grouping key and display name derived from a friendly name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NameKey {
    pub key: String,
    pub name: Option<String>,
}

impl NameKey {
    pub const DEFAULT_KEY: &'static str = "default";

    #[must_use]
    pub fn derive(facts: &EntityFacts) -> Self {
        let Some(friendly) = facts.friendly_name else {
            return Self::empty();
        };

        // a port entity names its device before the port token
        let mut words = match facts.port.as_ref().and_then(|p| p.name_offset) {
            Some(offset) => friendly[..offset].split_whitespace().collect::<Vec<_>>(),
            None => {
                let mut words = friendly.split_whitespace().collect::<Vec<_>>();
                words.truncate(words.len().saturating_sub(2));
                words
            }
        };
        words.retain(|word| !normalize_name(word).is_empty());

        let key = normalize_name(&words.join(" "));
        if key.is_empty() {
            return Self::empty();
        }

        Self {
            key,
            name: Some(words.join(" ")),
        }
    }

    fn empty() -> Self {
        Self {
            key: Self::DEFAULT_KEY.to_string(),
            name: None,
        }
    }
}
