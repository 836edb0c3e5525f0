//! Configuration management
//!
//! This module handles loading and managing configuration from:
//! - Command-line arguments
//! - Configuration files (TOML)
//! - Defaults

use crate::error::{Error, Result};
use crate::state_machine::{CompileOptions, State, TransitionCatalog};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub decode: DecodeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transition catalog settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    /// Catalog file; the built-in NAADSM catalog when unset
    pub path: Option<PathBuf>,

    /// Reject cyclic catalogs instead of truncating back edges
    #[serde(default)]
    pub strict_cycles: bool,
}

/// Decoding settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DecodeConfig {
    /// State assumed for every unit before day 0
    pub initial_state: Option<State>,

    /// Infer the initial state from the first day of every run
    #[serde(default)]
    pub guess_initial: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// Searches in order:
    /// 1. ./naadsm-events.toml
    /// 2. ~/.naadsm-events/config.toml
    /// 3. /etc/naadsm-events/config.toml
    pub fn load() -> Result<Self> {
        let mut paths = vec![PathBuf::from("naadsm-events.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".naadsm-events").join("config.toml"));
        }
        paths.push(PathBuf::from("/etc/naadsm-events/config.toml"));

        for path in paths {
            if path.exists() {
                tracing::info!("Loading config from {:?}", path);
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Catalog from the configured file, or the built-in NAADSM table
    pub fn transition_catalog(&self) -> Result<TransitionCatalog> {
        match &self.catalog.path {
            Some(path) => TransitionCatalog::from_file(path),
            None => Ok(TransitionCatalog::naadsm()),
        }
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            strict_cycles: self.catalog.strict_cycles,
        }
    }
}
