//! Scenario loading and configuration.
//!
//! Scenarios bundle a [`RaceConfig`] with a name and description so that
//! interesting setups can be kept as RON files or picked by preset name.

use std::path::Path;

use race_core::config::{AbilityTuning, RaceConfig};
use race_core::error::RaceError;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Race configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] RaceError),
    /// Neither a preset name nor an existing file.
    #[error("Unknown scenario '{0}' (presets: {presets})", presets = Scenario::PRESETS.join(", "))]
    UnknownPreset(String),
}

/// A named race setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Race configuration.
    #[serde(default)]
    pub config: RaceConfig,
}

/// Which fields a RON race config spells out, as opposed to defaulting.
#[derive(Debug, Default, Deserialize)]
#[serde(rename = "RaceConfig")]
struct ConfigFields {
    #[serde(default, deserialize_with = "present")]
    seed: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename = "Scenario")]
struct ScenarioFields {
    #[serde(default)]
    config: ConfigFields,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    IgnoredAny::deserialize(deserializer).map(|_| true)
}

/// A race config read from disk, remembering whether the file pinned the seed.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    /// Parsed configuration, defaults filled in.
    pub config: RaceConfig,
    /// True when the source set `seed` explicitly.
    pub seed_pinned: bool,
}

impl LoadedConfig {
    /// Parse a plain RON race configuration.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let config = RaceConfig::from_ron_str(ron)?;
        let fields: ConfigFields = ron::from_str(ron)?;
        Ok(Self {
            config,
            seed_pinned: fields.seed,
        })
    }

    /// Load a plain RON race configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let config = RaceConfig::load(path)?;
        let fields: ConfigFields = ron::from_str(&std::fs::read_to_string(path)?)?;
        Ok(Self {
            config,
            seed_pinned: fields.seed,
        })
    }
}

fn read_existing(path: &Path) -> Result<String, ScenarioError> {
    if !path.exists() {
        return Err(ScenarioError::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}

impl Default for Scenario {
    fn default() -> Self {
        Self::classic()
    }
}

impl Scenario {
    /// Built-in preset names.
    pub const PRESETS: [&'static str; 3] = ["classic", "sprint", "duel"];

    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(&read_existing(path.as_ref())?)?;
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Serialize to pretty RON.
    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Look up a preset by name.
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "classic" => Some(Self::classic()),
            "sprint" => Some(Self::sprint()),
            "duel" => Some(Self::duel()),
            _ => None,
        }
    }

    /// Resolve a preset name, falling back to a RON file path.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        Self::resolve_pinned(name_or_path).map(|(scenario, _)| scenario)
    }

    /// Like [`Self::resolve`], also reporting whether the seed was pinned.
    ///
    /// Presets never pin their seed; a file pins it by setting `config.seed`.
    pub fn resolve_pinned(name_or_path: &str) -> Result<(Self, bool), ScenarioError> {
        if let Some(scenario) = Self::preset(name_or_path) {
            return Ok((scenario, false));
        }
        let path = Path::new(name_or_path);
        if !path.exists() {
            return Err(ScenarioError::UnknownPreset(name_or_path.to_string()));
        }
        let contents = read_existing(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        let fields: ScenarioFields = ron::from_str(&contents)?;
        Ok((scenario, fields.config.seed))
    }

    /// Three racers on the default 18x36 board.
    #[must_use]
    pub fn classic() -> Self {
        Self {
            name: "classic".to_string(),
            description: "RoadRunner, Coyote and YosemiteSam on an 18x36 board".to_string(),
            config: RaceConfig::default(),
        }
    }

    /// Smallest board, fast pacing, trigger-happy abilities.
    #[must_use]
    pub fn sprint() -> Self {
        Self {
            name: "sprint".to_string(),
            description: "Short 5x20 dash with frequent abilities".to_string(),
            config: RaceConfig {
                rows: 5,
                cols: 20,
                tick_delay_ms: 60,
                abilities: AbilityTuning {
                    burst_chance: 0.3,
                    jump_chance: 0.5,
                    shoot_chance: 0.3,
                    shoot_cooldown_ms: 800,
                    freeze_ms: 500,
                },
                ..RaceConfig::default()
            },
        }
    }

    /// RoadRunner against Coyote, no shooter.
    #[must_use]
    pub fn duel() -> Self {
        Self {
            name: "duel".to_string(),
            description: "RoadRunner and Coyote head to head on a 12x30 board".to_string(),
            config: RaceConfig {
                rows: 12,
                cols: 30,
                agents: 2,
                ..RaceConfig::default()
            },
        }
    }
}
