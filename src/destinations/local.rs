//! Local (or mounted) directory destination

use super::{
    default_retention_copies, file_base_name, format_run_timestamp, split_generations,
    BackupDestination, SendError,
};
use crate::config::{expand_tilde, AdapterConfig, ConfigError};
use crate::managers::registry::AdapterContext;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const TYPE_TAG: &str = "local";

#[derive(Debug, Clone, Deserialize)]
pub struct LocalSettings {
    #[serde(default)]
    pub id: Option<String>,

    /// Root directory for backups
    pub path: PathBuf,

    /// Run generations kept per source
    #[serde(default = "default_retention_copies")]
    pub retention_copies: usize,
}

pub struct LocalDestination {
    id: String,
    root: PathBuf,
    retention_copies: usize,
    run_stamp: String,
}

impl LocalDestination {
    pub fn new(settings: LocalSettings, run_stamp: String) -> Self {
        Self {
            id: settings.id.unwrap_or_else(|| TYPE_TAG.to_string()),
            root: expand_tilde(&settings.path),
            retention_copies: settings.retention_copies,
            run_stamp,
        }
    }

    /// Registry constructor
    pub fn construct(
        config: &AdapterConfig,
        context: &AdapterContext,
    ) -> Result<Box<dyn BackupDestination>, ConfigError> {
        let settings: LocalSettings = config.parse()?;
        if settings.retention_copies == 0 {
            return Err(ConfigError::ValidationError(format!(
                "Destination '{}': retention_copies must be at least 1",
                settings.id.as_deref().unwrap_or(TYPE_TAG)
            )));
        }
        Ok(Box::new(Self::new(settings, format_run_timestamp(&context.run_time))))
    }

    fn io_error(&self, source: std::io::Error) -> SendError {
        SendError::Io {
            destination: self.id.clone(),
            source,
        }
    }
}

impl BackupDestination for LocalDestination {
    fn id(&self) -> &str {
        &self.id
    }

    fn send(&self, source_id: &str, source_name: &str, file: &Path) -> Result<String, SendError> {
        let target_dir = self.root.join(source_id).join(&self.run_stamp);
        let target = target_dir.join(file_base_name(file)?);
        info!(
            "Copying '{}' backup for '{}' to {:?}...",
            source_name, self.id, target
        );

        fs::create_dir_all(&target_dir).map_err(|e| self.io_error(e))?;
        fs::copy(file, &target).map_err(|e| self.io_error(e))?;

        Ok(target.display().to_string())
    }

    fn cleanup(&self, source_id: &str, source_name: &str) -> Result<Vec<String>, SendError> {
        let source_dir = self.root.join(source_id);
        if !source_dir.exists() {
            return Ok(Vec::new());
        }

        let generations: Vec<String> = fs::read_dir(&source_dir)
            .map_err(|e| self.io_error(e))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();

        let (kept, expired) = split_generations(generations, self.retention_copies);
        for generation in &expired {
            let path = source_dir.join(generation);
            info!("Removing expired backup {:?} for '{}'", path, source_name);
            fs::remove_dir_all(&path).map_err(|e| self.io_error(e))?;
        }

        let mut retained = Vec::new();
        for generation in &kept {
            let mut files: Vec<PathBuf> = fs::read_dir(source_dir.join(generation))
                .map_err(|e| self.io_error(e))?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect();
            files.sort();
            retained.extend(files.iter().map(|p| p.display().to_string()));
        }

        debug!(
            "Local ({}) retains {} file(s) for '{}'",
            self.id,
            retained.len(),
            source_name
        );
        Ok(retained)
    }
}
