//! Extraction configuration
//!
//! [`ExtractOptions`] holds the resolved values every extractor reads: unit
//! tables, the phenotype code table, the minimum lattice cell volume and the
//! steady-state diffusion threshold. Options are built in code
//! (`ExtractOptions::default().with_minimum_volume(..)`) or loaded from a
//! YAML [`ExtractConfig`] file whose entries are layered over the built-in
//! defaults:
//!
//! ```yaml
//! apiVersion: lattice/v1
//! kind: ExtractConfig
//!
//! minimumVolume: 8
//! steadyStateThreshold: 1000
//!
//! # Extra or replaced unit names (meters / minutes per unit)
//! units:
//!   length:
//!     furlong: 201.168
//!   time:
//!     fortnight: 20160
//!
//! # Extra or replaced phenotype codes
//! phenotypeCodes:
//!   "8": Simple Live
//! ```

use std::path::Path;

use lattice_units::UnitTables;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cell::{PhenotypeCodes, PhenotypeVariant};

const API_VERSION: &str = "lattice/v1";
const KIND: &str = "ExtractConfig";

/// Smallest lattice volume (in sites) a cell keeps its shape at.
pub const DEFAULT_MINIMUM_VOLUME: f64 = 8.0;

/// Converted diffusion coefficient above which a field is solved as steady state.
pub const DEFAULT_STEADY_STATE_THRESHOLD: f64 = 1000.0;

/// Errors that can occur when loading an extraction config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the config YAML.
    #[error("failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid apiVersion: expected 'lattice/v1', got '{0}'")]
    InvalidApiVersion(String),

    #[error("invalid kind: expected 'ExtractConfig', got '{0}'")]
    InvalidKind(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// On-disk configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_kind")]
    pub kind: String,

    #[serde(default = "default_minimum_volume")]
    pub minimum_volume: f64,

    #[serde(default = "default_steady_state_threshold")]
    pub steady_state_threshold: f64,

    /// Unit names added to (or replacing) the built-in tables.
    #[serde(default = "UnitTables::empty")]
    pub units: UnitTables,

    /// Phenotype codes added to (or replacing) the built-in table.
    #[serde(default = "PhenotypeCodes::empty")]
    pub phenotype_codes: PhenotypeCodes,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

fn default_minimum_volume() -> f64 {
    DEFAULT_MINIMUM_VOLUME
}

fn default_steady_state_threshold() -> f64 {
    DEFAULT_STEADY_STATE_THRESHOLD
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            minimum_volume: DEFAULT_MINIMUM_VOLUME,
            steady_state_threshold: DEFAULT_STEADY_STATE_THRESHOLD,
            units: UnitTables::empty(),
            phenotype_codes: PhenotypeCodes::empty(),
        }
    }
}

impl ExtractConfig {
    /// Load a config from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a config from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: ExtractConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.api_version != API_VERSION {
            return Err(ConfigError::InvalidApiVersion(self.api_version.clone()));
        }
        if self.kind != KIND {
            return Err(ConfigError::InvalidKind(self.kind.clone()));
        }
        if !self.minimum_volume.is_finite() || self.minimum_volume < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "minimumVolume",
                message: format!("must be a non-negative number, got {}", self.minimum_volume),
            });
        }
        if !self.steady_state_threshold.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "steadyStateThreshold",
                message: format!("must be finite, got {}", self.steady_state_threshold),
            });
        }
        let tables = [
            ("units.length", &self.units.length),
            ("units.time", &self.units.time),
        ];
        for (field, table) in tables {
            for name in table.names() {
                let factor = table.lookup(name).unwrap_or_default();
                if !(factor.is_finite() && factor > 0.0) {
                    return Err(ConfigError::InvalidValue {
                        field,
                        message: format!("factor for '{name}' must be positive, got {factor}"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolve into options, layering overrides over the built-in tables.
    pub fn to_options(&self) -> ExtractOptions {
        let mut codes = PhenotypeCodes::default();
        codes.extend(&self.phenotype_codes);
        ExtractOptions {
            units: UnitTables::default().merged(&self.units),
            phenotype_codes: codes,
            minimum_volume: self.minimum_volume,
            steady_state_threshold: self.steady_state_threshold,
        }
    }
}

/// Resolved parameters for one extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    pub units: UnitTables,
    pub phenotype_codes: PhenotypeCodes,
    pub minimum_volume: f64,
    pub steady_state_threshold: f64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            units: UnitTables::default(),
            phenotype_codes: PhenotypeCodes::default(),
            minimum_volume: DEFAULT_MINIMUM_VOLUME,
            steady_state_threshold: DEFAULT_STEADY_STATE_THRESHOLD,
        }
    }
}

impl From<&ExtractConfig> for ExtractOptions {
    fn from(config: &ExtractConfig) -> Self {
        config.to_options()
    }
}

impl ExtractOptions {
    /// Builder method: set the minimum lattice cell volume.
    pub fn with_minimum_volume(mut self, minimum: f64) -> Self {
        self.minimum_volume = minimum;
        self
    }

    /// Builder method: set the steady-state diffusion threshold.
    pub fn with_steady_state_threshold(mut self, threshold: f64) -> Self {
        self.steady_state_threshold = threshold;
        self
    }

    /// Builder method: replace the unit tables.
    pub fn with_units(mut self, units: UnitTables) -> Self {
        self.units = units;
        self
    }

    /// Builder method: add or replace a phenotype code.
    pub fn with_phenotype_code(mut self, code: impl Into<String>, variant: PhenotypeVariant) -> Self {
        self.phenotype_codes.insert(code, variant);
        self
    }
}
