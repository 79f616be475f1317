//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating job descriptions whose paths all
//! live in one temporary directory.

use backup_orchestrator::config::{AdapterConfig, Config, LoggingSettings};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    modules: Option<Vec<String>>,
    sources: Vec<AdapterConfig>,
    destinations: Vec<AdapterConfig>,
    notifications: Vec<AdapterConfig>,
    logging: LoggingSettings,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with no entries and the default modules
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        // Dumps and local backups land here
        fs::create_dir_all(temp_dir.path().join("tmp")).expect("Failed to create tmp dir");
        fs::create_dir_all(temp_dir.path().join("backups")).expect("Failed to create backups dir");

        Self {
            temp_dir,
            modules: None,
            sources: Vec::new(),
            destinations: Vec::new(),
            notifications: Vec::new(),
            logging: LoggingSettings::default(),
        }
    }

    /// Modules for a filesystem-only run: command sources and local destinations
    pub fn local() -> Self {
        Self::new().modules(&["sources.command", "destinations.local"])
    }

    pub fn modules(mut self, modules: &[&str]) -> Self {
        self.modules = Some(modules.iter().map(|m| m.to_string()).collect());
        self
    }

    /// Add a shell command source dumping into the builder's tmp dir
    pub fn command_source(mut self, id: &str, command: &str) -> Self {
        let entry = AdapterConfig::new(
            "command",
            json!({
                "id": id,
                "command": command,
                "tmpdir": self.tmp_dir(),
            }),
        );
        self.sources.push(entry);
        self
    }

    pub fn mysql_source(mut self, id: &str, dbname: &str) -> Self {
        let entry = AdapterConfig::new(
            "mysql",
            json!({
                "id": id,
                "dbhost": "localhost",
                "dbuser": "backup",
                "dbpass": "secret",
                "dbname": dbname,
                "tmpdir": self.tmp_dir(),
            }),
        );
        self.sources.push(entry);
        self
    }

    /// Add a local destination rooted in the builder's backups dir
    pub fn local_destination(mut self, id: &str, retention_copies: usize) -> Self {
        let entry = AdapterConfig::new(
            "local",
            json!({
                "id": id,
                "path": self.backup_dir(),
                "retention_copies": retention_copies,
            }),
        );
        self.destinations.push(entry);
        self
    }

    pub fn s3_destination(mut self, id: &str, bucket: &str) -> Self {
        let entry = AdapterConfig::new(
            "s3",
            json!({
                "id": id,
                "bucket": bucket,
                "region": "eu-west-1",
            }),
        );
        self.destinations.push(entry);
        self
    }

    /// Add an arbitrary entry to one section
    pub fn entry(mut self, section: &str, entry: AdapterConfig) -> Self {
        match section {
            "sources" => self.sources.push(entry),
            "destinations" => self.destinations.push(entry),
            "notifications" => self.notifications.push(entry),
            other => panic!("Unknown config section: {}", other),
        }
        self
    }

    pub fn log_directory(mut self, dir: &Path) -> Self {
        self.logging.log_directory = Some(dir.to_path_buf());
        self
    }

    /// Directory source dumps are written to
    pub fn tmp_dir(&self) -> PathBuf {
        self.temp_dir.path().join("tmp")
    }

    /// Root of local destinations
    pub fn backup_dir(&self) -> PathBuf {
        self.temp_dir.path().join("backups")
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Build the configuration
    pub fn build(&self) -> Config {
        Config {
            modules: self.modules.clone(),
            sources: self.sources.clone(),
            destinations: self.destinations.clone(),
            notifications: self.notifications.clone(),
            logging: self.logging.clone(),
        }
    }

    /// Write the configuration as JSON and return its path
    pub fn write_json(&self) -> PathBuf {
        let path = self.temp_dir.path().join("backup.json");
        let contents = serde_json::to_string_pretty(&self.build()).expect("Failed to serialize config");
        fs::write(&path, contents).expect("Failed to write config file");
        path
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
