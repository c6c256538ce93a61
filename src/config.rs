use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Interpreter settings written into the story header and used by the
/// save machinery. Every field has a default so partial files are fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub interpreter: InterpreterConfig,
    pub screen: ScreenConfig,
    pub colours: ColourConfig,
    pub standard_revision: StandardRevision,
    pub timed_input: bool,
    pub saves: SaveConfig,
    /// Maximum number of evaluation-stack entries
    pub stack_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    pub number: u8,
    pub version: char,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Lines
    pub height: u8,
    /// Characters
    pub width: u8,
    pub font_width: u8,
    pub font_height: u8,
    pub split: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColourConfig {
    pub enabled: bool,
    pub background: u8,
    pub foreground: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardRevision {
    pub major: u8,
    pub minor: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Write CMem deltas rather than raw UMem snapshots
    pub compress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            interpreter: InterpreterConfig::default(),
            screen: ScreenConfig::default(),
            colours: ColourConfig::default(),
            standard_revision: StandardRevision::default(),
            timed_input: false,
            saves: SaveConfig::default(),
            stack_size: 1024,
        }
    }
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        // 6 = IBM PC
        InterpreterConfig {
            number: 6,
            version: 'A',
        }
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        ScreenConfig {
            height: 24,
            width: 80,
            font_width: 1,
            font_height: 1,
            split: true,
        }
    }
}

impl Default for ColourConfig {
    fn default() -> Self {
        // 2 = black, 9 = white
        ColourConfig {
            enabled: false,
            background: 2,
            foreground: 9,
        }
    }
}

impl Default for StandardRevision {
    fn default() -> Self {
        StandardRevision { major: 1, minor: 1 }
    }
}

impl Default for SaveConfig {
    fn default() -> Self {
        SaveConfig { compress: true }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
