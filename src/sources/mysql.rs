//! MySQL source: dumps databases with `mysqldump`

use super::{discard_partial_dump, BackupSource, DumpError, SourceInfo, SourceSettings};
use crate::config::{AdapterConfig, ConfigError};
use crate::managers::registry::AdapterContext;
use crate::utils::{CommandExecutor, CommandSpec};
use serde::Deserialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const TYPE_TAG: &str = "mysql";

const MYSQLDUMP: &str = "mysqldump";

#[derive(Debug, Clone, Deserialize)]
pub struct MySqlSettings {
    #[serde(flatten)]
    pub common: SourceSettings,

    pub dbhost: String,

    #[serde(default)]
    pub dbuser: Option<String>,

    #[serde(default)]
    pub dbpass: Option<String>,

    /// Whitespace separated database names; all databases when unset
    #[serde(default)]
    pub dbname: Option<String>,

    /// Existing option file to use instead of generated credentials
    #[serde(default)]
    pub defaults: Option<PathBuf>,

    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl MySqlSettings {
    fn databases(&self) -> Vec<&str> {
        self.dbname
            .as_deref()
            .map(|names| names.split_whitespace().collect())
            .unwrap_or_default()
    }
}

pub struct MySqlSource {
    settings: MySqlSettings,
    info: SourceInfo,
    executor: Arc<dyn CommandExecutor>,
}

impl MySqlSource {
    pub fn new(settings: MySqlSettings, executor: Arc<dyn CommandExecutor>) -> Self {
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
        let settings: MySqlSettings = config.parse()?;
        Ok(Box::new(Self::new(settings, context.executor.clone())))
    }

    fn dump_args(&self, defaults_file: Option<&Path>) -> Vec<String> {
        let mut args = Vec::new();
        // --defaults-file must be the first option
        if let Some(path) = defaults_file {
            args.push(format!("--defaults-file={}", path.display()));
        }
        args.push(format!("--host={}", self.settings.dbhost));
        args.push("-R".to_string());

        let databases = self.settings.databases();
        if databases.is_empty() {
            args.push("--all-databases".to_string());
        } else {
            args.push("--databases".to_string());
            args.extend(databases.into_iter().map(String::from));
        }
        args
    }

    /// Generated credentials, or the configured option file
    fn credentials(&self) -> io::Result<(Option<CredentialsFile>, Option<PathBuf>)> {
        if let Some(ref defaults) = self.settings.defaults {
            return Ok((None, Some(defaults.clone())));
        }

        match self.settings.dbuser {
            Some(ref user) => {
                let path = self.settings.common.dump_path("my.cnf");
                let file = CredentialsFile::create(
                    &path,
                    &self.settings.dbhost,
                    user,
                    self.settings.dbpass.as_deref().unwrap_or_default(),
                )?;
                Ok((Some(file), Some(path)))
            }
            None => Ok((None, None)),
        }
    }
}

impl BackupSource for MySqlSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn dump(&self) -> Result<Vec<PathBuf>, DumpError> {
        let program = self
            .executor
            .locate(MYSQLDUMP)
            .ok_or_else(|| DumpError::MissingTool(MYSQLDUMP.to_string()))?;

        fs::create_dir_all(&self.settings.common.tmpdir)?;

        // Removed on drop, whichever way this function returns
        let (_credentials, defaults_file) = self.credentials()?;

        let dump_path = self.settings.common.dump_path("sql");
        info!("Backing up '{}' ({})...", self.info.name, TYPE_TAG);

        let spec = CommandSpec::new(program.display().to_string())
            .args(self.dump_args(defaults_file.as_deref()))
            .stdout_to(&dump_path)
            .timeout(self.settings.timeout_seconds.map(Duration::from_secs));

        if let Err(e) = self.executor.run(&spec) {
            discard_partial_dump(&dump_path);
            return Err(e.into());
        }

        Ok(vec![dump_path])
    }
}

/// Client option file holding the dump credentials, removed on drop
struct CredentialsFile {
    path: PathBuf,
}

impl CredentialsFile {
    fn create(path: &Path, host: &str, user: &str, password: &str) -> io::Result<Self> {
        // A stale read-only file from an interrupted run would block the rewrite
        if path.exists() {
            fs::remove_file(path)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        let guard = Self {
            path: path.to_path_buf(),
        };
        write!(
            file,
            "[client]\nhost={}\nuser={}\npassword={}\n\n",
            host, user, password
        )?;
        file.flush()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o400))?;
        }

        debug!("Wrote credentials file: {:?}", path);
        Ok(guard)
    }
}

impl Drop for CredentialsFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed credentials file: {:?}", self.path),
            Err(e) => warn!("Failed to remove credentials file {:?}: {}", self.path, e),
        }
    }
}
