//! Configuration for the key index.
//!
//! Configuration is loaded with precedence: explicit overrides > Env vars > Config file > Defaults
//!
//! # Example config file (keyindex.toml)
//! ```toml
//! initial_capacity = 4096
//! load_factor = 0.7
//! max_capacity = 67108864
//! ```

mod defaults;

pub use defaults::*;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Sizing of the per-type ordinal tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Slots allocated when a table is created (rounded up to a power of two)
    pub initial_capacity: usize,
    /// Occupancy fraction that triggers doubling, in `(0, 1)`
    pub load_factor: f64,
    /// Hard upper bound on slots per table
    pub max_capacity: Option<usize>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            load_factor: DEFAULT_LOAD_FACTOR,
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}

impl IndexConfig {
    /// Load configuration with precedence: overrides > Env > File > Defaults
    ///
    /// # Arguments
    /// * `config_path` - Optional path to TOML config file
    /// * `overrides` - Explicit overrides to apply on top
    pub fn load(
        config_path: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(IndexConfig::default()));

        // Layer 1: Config file (if provided)
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Layer 2: Environment variables with KEYINDEX_ prefix
        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        // Layer 3: Explicit overrides
        figment = figment.merge(Serialized::defaults(overrides));

        let config: IndexConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment and optional config file only
    pub fn from_env(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load(config_path, ConfigOverrides::default())
    }

    /// Reject values the ordinal table cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.load_factor > 0.0 && self.load_factor < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "load_factor must be in (0, 1), got {}",
                self.load_factor
            )));
        }
        if self.initial_capacity == 0 {
            return Err(ConfigError::Invalid(
                "initial_capacity must be positive".to_string(),
            ));
        }
        if let Some(max) = self.max_capacity {
            if max < self.initial_capacity.max(2).next_power_of_two() {
                return Err(ConfigError::Invalid(format!(
                    "max_capacity {} is below initial_capacity {}",
                    max, self.initial_capacity
                )));
            }
        }
        Ok(())
    }
}

/// Explicit overrides that take precedence over file and env config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_capacity: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<usize>,
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Load(Box::new(e))
    }
}
