use super::types::*;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Failed to parse config file: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid settings for {adapter_type} '{id}': {source}")]
    InvalidAdapter {
        adapter_type: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No sources listed in configuration file.")]
    NoSources,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Document syntax of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// TOML for a `.toml` extension, JSON for everything else
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Load and validate configuration from a JSON or TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    parse_config(&contents, ConfigFormat::from_path(path))
}

/// Parse and validate configuration text
pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<Config> {
    let config: Config = match format {
        ConfigFormat::Json => serde_json::from_str(contents)?,
        ConfigFormat::Toml => toml::from_str(contents)?,
    };
    validate_config(&config)?;
    Ok(config)
}

/// Validate the configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.sources.is_empty() {
        return Err(ConfigError::NoSources);
    }

    let sections = [
        ("sources", &config.sources),
        ("destinations", &config.destinations),
        ("notifications", &config.notifications),
    ];
    for (section, entries) in sections {
        for (index, entry) in entries.iter().enumerate() {
            if entry.adapter_type.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{}[{}]: empty adapter type",
                    section, index
                )));
            }
        }
    }

    // Dump files are named after the source id, so ids must not collide
    let mut seen = HashSet::new();
    for (index, source) in config.sources.iter().enumerate() {
        let id = source.id().unwrap_or_default();
        if id.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "sources[{}] ({}): missing id",
                index, source.adapter_type
            )));
        }
        if !seen.insert(id) {
            return Err(ConfigError::ValidationError(format!(
                "Duplicate source id: {}",
                id
            )));
        }
    }

    if let Some(ref modules) = config.modules {
        if modules.iter().any(|m| m.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "Empty module identifier".to_string(),
            ));
        }
    }

    Ok(())
}
