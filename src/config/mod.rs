//! Configuration module for backup-orchestrator
//!
//! This module handles loading and validating the job description. The document
//! is JSON by default; a `.toml` extension selects TOML.
//!
//! ## Layout
//!
//! - `modules`: adapter modules to enable, or null for the default set
//! - `sources`, `destinations`, `notifications`: lists of entries, each with a
//!   `type` tag matched against the registered adapters plus adapter fields
//! - `logging`: optional rotated file logging
//!
//! ## Example Usage
//!
//! ```no_run
//! use backup_orchestrator::config;
//!
//! let config = config::load_config("backup.json")?;
//! for source in &config.sources {
//!     println!("Source: {:?} ({})", source.id(), source.adapter_type);
//! }
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{load_config, parse_config, ConfigError, ConfigFormat, Result};
pub use types::*;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
