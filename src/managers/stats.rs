//! Per-source run statistics

use chrono::{DateTime, Local};
use std::time::Duration;

/// Timing and size metrics for one source's backup attempt
///
/// Fields stay `None` until their phase completes, so a failed attempt carries
/// only what finished before the failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatistics {
    /// Start of the dump phase
    pub start_time: Option<DateTime<Local>>,
    /// End of the send phase
    pub end_time: Option<DateTime<Local>>,
    /// Combined size of all dump files in bytes
    pub size: Option<u64>,
    /// One location per (dump file, destination) pair sent
    pub dumped_files: Vec<String>,
    /// Locations reported as retained by destination cleanup
    pub retained_files: Vec<String>,
    pub dump_time: Option<Duration>,
    /// Send and cleanup across all destinations
    pub upload_time: Option<Duration>,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Human readable size, e.g. `"1.5 MB"`
    pub fn size_description(&self) -> String {
        match self.size {
            Some(size) => describe_size(size),
            None => "unknown".to_string(),
        }
    }

    /// Wall time from dump start to the end of the send phase
    pub fn total_time(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start).to_std().ok(),
            _ => None,
        }
    }
}

fn describe_size(size: u64) -> String {
    let mut num = size as f64;
    for unit in ["bytes", "KB", "MB", "GB", "TB"] {
        if num < 1024.0 {
            return format!("{:.1} {}", num, unit);
        }
        num /= 1024.0;
    }
    "NaN".to_string()
}
