//! Destination adapters ship dump files to durable storage and apply retention
//!
//! Every destination lays backups out as `<root>/<source id>/<run timestamp>/<file>`.
//! The run timestamp is fixed once per process run, so each run forms one
//! generation per source and retention keeps the newest generations.

pub mod local;
pub mod s3;

use crate::utils::CommandError;
use chrono::{DateTime, Local};
use std::path::Path;

pub use local::LocalDestination;
pub use s3::S3Destination;

/// Sortable run timestamp used in remote paths
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

const RUN_TIMESTAMP_LEN: usize = 14;

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Error while uploading ({destination}): {source}")]
    Command {
        destination: String,
        #[source]
        source: CommandError,
    },

    #[error("I/O error at destination ({destination}): {source}")]
    Io {
        destination: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Required tool '{0}' not found in PATH")]
    MissingTool(String),

    #[error("Invalid dump file path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Failed(String),
}

/// A storage backend for dump files
pub trait BackupDestination {
    fn id(&self) -> &str;

    /// Transfer one dump file, returning its destination-qualified location
    fn send(&self, source_id: &str, source_name: &str, file: &Path) -> Result<String, SendError>;

    /// Apply retention for a source, returning the locations still retained
    fn cleanup(&self, source_id: &str, source_name: &str) -> Result<Vec<String>, SendError>;
}

pub fn format_run_timestamp(run_time: &DateTime<Local>) -> String {
    run_time.format(RUN_TIMESTAMP_FORMAT).to_string()
}

/// Whether a path segment is a generation written by [`format_run_timestamp`]
pub fn is_run_timestamp(segment: &str) -> bool {
    segment.len() == RUN_TIMESTAMP_LEN && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Split generations into (kept, expired), newest first
///
/// Segments that are not run timestamps are ignored entirely.
pub fn split_generations<I, S>(generations: I, keep: usize) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut generations: Vec<String> = generations
        .into_iter()
        .map(Into::into)
        .filter(|g| is_run_timestamp(g))
        .collect();
    generations.sort_unstable_by(|a, b| b.cmp(a));
    generations.dedup();

    let expired = generations.split_off(keep.min(generations.len()));
    (generations, expired)
}

/// Base name of a dump file
pub fn file_base_name(file: &Path) -> Result<String, SendError> {
    file.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| SendError::InvalidPath(file.display().to_string()))
}

fn default_retention_copies() -> usize { 7 }
