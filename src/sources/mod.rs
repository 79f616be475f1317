//! Source adapters produce local dump files for a logical data source

pub mod command;
pub mod mysql;

use crate::utils::CommandError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub use command::CommandSource;
pub use mysql::MySqlSource;

/// Where dump files are written unless a source sets `tmpdir`
pub const DEFAULT_TMPDIR: &str = "/var/tmp";

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("Error while dumping: {0}")]
    Command(#[from] CommandError),

    #[error("Required tool '{0}' not found in PATH")]
    MissingTool(String),

    #[error("I/O error while dumping: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Failed(String),
}

/// Identity of a configured source, as seen by notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub id: String,
    pub name: String,
    pub source_type: String,
}

/// Settings shared by every source adapter
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSettings {
    pub id: String,

    /// Display name, defaults to the id
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_tmpdir")]
    pub tmpdir: PathBuf,
}

impl SourceSettings {
    pub fn info(&self, source_type: &str) -> SourceInfo {
        SourceInfo {
            id: self.id.clone(),
            name: self.name.clone().unwrap_or_else(|| self.id.clone()),
            source_type: source_type.to_string(),
        }
    }

    /// `<tmpdir>/<id>.<extension>`
    pub fn dump_path(&self, extension: &str) -> PathBuf {
        self.tmpdir.join(format!("{}.{}", self.id, extension))
    }
}

fn default_tmpdir() -> PathBuf {
    PathBuf::from(DEFAULT_TMPDIR)
}

/// A producer of backup dumps
pub trait BackupSource {
    fn info(&self) -> &SourceInfo;

    /// Produce one or more local dump files
    fn dump(&self) -> Result<Vec<PathBuf>, DumpError>;
}

/// Remove a dump file left behind by a failed tool run
pub(crate) fn discard_partial_dump(path: &Path) {
    if !path.exists() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed partial dump file: {:?}", path),
        Err(e) => warn!("Failed to remove partial dump file {:?}: {}", path, e),
    }
}
