use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

use super::loader::ConfigError;

/// Module identifiers loaded when the configuration sets `modules` to null
pub const DEFAULT_MODULES: &[&str] = &[
    "sources.mysql",
    "destinations.s3",
    "notifications.prometheus",
];

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Adapter modules to enable (None selects [`DEFAULT_MODULES`])
    #[serde(default)]
    pub modules: Option<Vec<String>>,

    #[serde(default)]
    pub sources: Vec<AdapterConfig>,

    #[serde(default)]
    pub destinations: Vec<AdapterConfig>,

    #[serde(default)]
    pub notifications: Vec<AdapterConfig>,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Config {
    /// Module identifiers in effect for this run
    pub fn effective_modules(&self) -> Vec<String> {
        match self.modules {
            Some(ref modules) => modules.clone(),
            None => DEFAULT_MODULES.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// One `sources`/`destinations`/`notifications` entry
///
/// The `type` tag selects the adapter; every other key is handed to that
/// adapter, which parses its own typed settings with [`AdapterConfig::parse`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AdapterConfig {
    #[serde(rename = "type")]
    pub adapter_type: String,

    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl AdapterConfig {
    pub fn new(adapter_type: &str, settings: Value) -> Self {
        let settings = match settings {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            adapter_type: adapter_type.to_string(),
            settings,
        }
    }

    /// The entry's `id` field, if it is a string
    pub fn id(&self) -> Option<&str> {
        self.settings.get("id").and_then(Value::as_str)
    }

    /// Deserialize the adapter-specific settings
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        serde_json::from_value(Value::Object(self.settings.clone())).map_err(|source| {
            ConfigError::InvalidAdapter {
                adapter_type: self.adapter_type.clone(),
                id: self.id().unwrap_or("<unnamed>").to_string(),
                source,
            }
        })
    }
}

/// Optional file logging
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Directory for rotated log files; console only when unset
    #[serde(default)]
    pub log_directory: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_max_files")]
    pub max_files: u32,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_directory: None,
            log_level: default_log_level(),
            max_files: default_log_max_files(),
        }
    }
}

fn default_log_level() -> String { "debug".to_string() }
fn default_log_max_files() -> u32 { 10 }
