//! Command source: captures the stdout of a shell command as the dump

use super::{discard_partial_dump, BackupSource, DumpError, SourceInfo, SourceSettings};
use crate::config::{AdapterConfig, ConfigError};
use crate::managers::registry::AdapterContext;
use crate::utils::{CommandExecutor, CommandSpec};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const TYPE_TAG: &str = "command";

#[derive(Debug, Clone, Deserialize)]
pub struct CommandSettings {
    #[serde(flatten)]
    pub common: SourceSettings,

    /// Shell line whose stdout becomes the dump
    pub command: String,

    /// Dump file extension
    #[serde(default = "default_suffix")]
    pub suffix: String,

    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

fn default_suffix() -> String { "dump".to_string() }

pub struct CommandSource {
    settings: CommandSettings,
    info: SourceInfo,
    executor: Arc<dyn CommandExecutor>,
}

impl CommandSource {
    pub fn new(settings: CommandSettings, executor: Arc<dyn CommandExecutor>) -> Self {
        let info = settings.common.info(TYPE_TAG);
        Self {
            settings,
            info,
            executor,
        }
    }

    /// Registry constructor
    pub fn construct(
        config: &AdapterConfig,
        context: &AdapterContext,
    ) -> Result<Box<dyn BackupSource>, ConfigError> {
        let settings: CommandSettings = config.parse()?;
        if settings.command.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Source '{}': empty command",
                settings.common.id
            )));
        }
        Ok(Box::new(Self::new(settings, context.executor.clone())))
    }
}

impl BackupSource for CommandSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn dump(&self) -> Result<Vec<PathBuf>, DumpError> {
        fs::create_dir_all(&self.settings.common.tmpdir)?;

        let dump_path = self.settings.common.dump_path(&self.settings.suffix);
        info!("Backing up '{}' ({})...", self.info.name, TYPE_TAG);

        let spec = CommandSpec::shell(&self.settings.command)
            .stdout_to(&dump_path)
            .timeout(self.settings.timeout_seconds.map(Duration::from_secs));

        if let Err(e) = self.executor.run(&spec) {
            discard_partial_dump(&dump_path);
            return Err(e.into());
        }

        Ok(vec![dump_path])
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::utils::RealExecutor;
    use tempfile::TempDir;

    fn source(tmpdir: &std::path::Path, command: &str) -> CommandSource {
        let settings: CommandSettings = serde_json::from_value(serde_json::json!({
            "id": "etc",
            "tmpdir": tmpdir,
            "command": command,
            "suffix": "tar",
        }))
        .unwrap();
        CommandSource::new(settings, Arc::new(RealExecutor::new()))
    }

    #[test]
    fn test_dump_captures_stdout() {
        let temp_dir = TempDir::new().unwrap();
        let files = source(temp_dir.path(), "head -c 1024 /dev/zero").dump().unwrap();

        assert_eq!(files, vec![temp_dir.path().join("etc.tar")]);
        assert_eq!(fs::metadata(&files[0]).unwrap().len(), 1024);
    }

    #[test]
    fn test_failed_command_leaves_no_dump() {
        let temp_dir = TempDir::new().unwrap();
        let err = source(temp_dir.path(), "printf partial; echo 'disk full' >&2; exit 1")
            .dump()
            .unwrap_err();

        assert!(err.to_string().contains("disk full"));
        assert!(!temp_dir.path().join("etc.tar").exists());
    }

    #[test]
    fn test_construct_rejects_empty_command() {
        let config = AdapterConfig::new("command", serde_json::json!({"id": "x", "command": "  "}));
        let context = AdapterContext::new(Arc::new(RealExecutor::new()));
        assert!(CommandSource::construct(&config, &context).is_err());
    }
}
