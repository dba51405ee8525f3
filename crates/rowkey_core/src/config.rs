// config.rs: parser, generator and pipeline options
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, RowKeyError};
use crate::identifier::drbg::{DrbgParams, MAX_STRENGTH_BITS};

pub const CONFIG_VERSION: u32 = 1;
pub const DEFAULT_SEPARATOR: char = ',';
pub const DEFAULT_QUOTE: char = '"';

/// Random bit source used to draw identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mechanism {
    /// Per-record Hash_DRBG personalized with the record bytes.
    #[default]
    HashDrbg,
    /// Platform default CSPRNG, no personalization.
    System,
}

/// Which string of a record is fed to the generator as personalization input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PersonalizationMode {
    #[default]
    Fields,
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParseOptions {
    pub separator: char,
    pub quote: char,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { separator: DEFAULT_SEPARATOR, quote: DEFAULT_QUOTE }
    }
}

impl ParseOptions {
    /// A space for either character means "use the default".
    pub fn normalized(self) -> Self {
        Self {
            separator: if self.separator == ' ' { DEFAULT_SEPARATOR } else { self.separator },
            quote: if self.quote == ' ' { DEFAULT_QUOTE } else { self.quote },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub mechanism: Mechanism,
    pub strength_bits: u32,
    pub prediction_resistance: bool,
    pub reseed: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mechanism: Mechanism::HashDrbg,
            strength_bits: MAX_STRENGTH_BITS,
            prediction_resistance: true,
            reseed: true,
        }
    }
}

impl GeneratorConfig {
    pub fn drbg_params(&self) -> DrbgParams {
        DrbgParams {
            strength_bits: self.strength_bits,
            prediction_resistance: self.prediction_resistance,
            reseed: self.reseed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub version: Option<u32>,
    pub separator: char,
    pub quote: char,
    pub skip_header: bool,
    pub personalization: PersonalizationMode,
    /// Placed between fields when building the personalization string.
    pub join_with: String,
    /// Count lines up front to size the result vector.
    pub presize: bool,
    pub generator: GeneratorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: Some(CONFIG_VERSION),
            separator: DEFAULT_SEPARATOR,
            quote: DEFAULT_QUOTE,
            skip_header: true,
            personalization: PersonalizationMode::Fields,
            join_with: String::new(),
            presize: false,
            generator: GeneratorConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions { separator: self.separator, quote: self.quote }.normalized()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: PipelineConfig = serde_json::from_str(json)?;
        if let Some(v) = cfg.version {
            if v != CONFIG_VERSION {
                return Err(RowKeyError::UnsupportedVersion(v));
            }
        }
        Ok(cfg)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }
}
