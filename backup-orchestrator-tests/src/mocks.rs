//! Recording adapters
//!
//! Every adapter appends to a shared [`EventLog`], so a test can assert the
//! exact order in which the orchestrator drove sources, destinations and
//! notifications.

use crate::fixtures::RUN_STAMP;
use backup_orchestrator::destinations::{BackupDestination, SendError};
use backup_orchestrator::notifications::{BackupNotification, NotificationError, NotifyTriggers};
use backup_orchestrator::sources::{BackupSource, DumpError, SourceInfo};
use backup_orchestrator::{RunError, RunStatistics};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One adapter call
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start {
        notifier: String,
        source: String,
    },
    Dump {
        source: String,
    },
    Send {
        destination: String,
        source: String,
        file: PathBuf,
    },
    Cleanup {
        destination: String,
        source: String,
    },
    Success {
        notifier: String,
        source: String,
        file: PathBuf,
        stats: RunStatistics,
    },
    Failure {
        notifier: String,
        source: String,
        error: String,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Start { .. } => "start",
            Event::Dump { .. } => "dump",
            Event::Send { .. } => "send",
            Event::Cleanup { .. } => "cleanup",
            Event::Success { .. } => "success",
            Event::Failure { .. } => "failure",
        }
    }
}

/// Shared, ordered record of adapter calls
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.events.lock().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Event kinds in call order
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(Event::kind).collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }

    /// Statistics handed to success notifications, in order
    pub fn success_stats(&self) -> Vec<RunStatistics> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Success { stats, .. } => Some(stats.clone()),
                _ => None,
            })
            .collect()
    }

    /// Error messages handed to failure notifications, in order
    pub fn failure_errors(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Failure { error, .. } => Some(error.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Source that writes fixed-size dump files, or fails
pub struct RecordingSource {
    info: SourceInfo,
    log: EventLog,
    dumps: Vec<(PathBuf, usize)>,
    failure: Option<String>,
}

impl RecordingSource {
    pub fn new(id: &str, log: &EventLog) -> Self {
        Self {
            info: SourceInfo {
                id: id.to_string(),
                name: id.to_string(),
                source_type: "recording".to_string(),
            },
            log: log.clone(),
            dumps: Vec::new(),
            failure: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.info.name = name.to_string();
        self
    }

    /// Add a dump file of `len` bytes written to `dir/name`
    pub fn with_dump(mut self, dir: &Path, name: &str, len: usize) -> Self {
        self.dumps.push((dir.join(name), len));
        self
    }

    /// Fail every dump with this message
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn dump_paths(&self) -> Vec<PathBuf> {
        self.dumps.iter().map(|(path, _)| path.clone()).collect()
    }
}

impl BackupSource for RecordingSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn dump(&self) -> Result<Vec<PathBuf>, DumpError> {
        self.log.push(Event::Dump {
            source: self.info.id.clone(),
        });
        if let Some(ref message) = self.failure {
            return Err(DumpError::Failed(message.clone()));
        }
        for (path, len) in &self.dumps {
            fs::write(path, vec![0u8; *len])?;
        }
        Ok(self.dump_paths())
    }
}

/// Destination that records calls and keeps a configurable number of copies
pub struct RecordingDestination {
    id: String,
    log: EventLog,
    retained: usize,
    send_failure: Option<String>,
    cleanup_failure: Option<String>,
}

impl RecordingDestination {
    pub fn new(id: &str, log: &EventLog) -> Self {
        Self {
            id: id.to_string(),
            log: log.clone(),
            retained: 1,
            send_failure: None,
            cleanup_failure: None,
        }
    }

    /// Number of locations each cleanup reports as surviving
    pub fn with_retained(mut self, retained: usize) -> Self {
        self.retained = retained;
        self
    }

    pub fn failing_send(mut self, message: &str) -> Self {
        self.send_failure = Some(message.to_string());
        self
    }

    pub fn failing_cleanup(mut self, message: &str) -> Self {
        self.cleanup_failure = Some(message.to_string());
        self
    }
}

impl BackupDestination for RecordingDestination {
    fn id(&self) -> &str {
        &self.id
    }

    fn send(&self, source_id: &str, _source_name: &str, file: &Path) -> Result<String, SendError> {
        self.log.push(Event::Send {
            destination: self.id.clone(),
            source: source_id.to_string(),
            file: file.to_path_buf(),
        });
        if let Some(ref message) = self.send_failure {
            return Err(SendError::Failed(message.clone()));
        }
        let base = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(format!("mock://{}/{}/{}/{}", self.id, source_id, RUN_STAMP, base))
    }

    fn cleanup(&self, source_id: &str, _source_name: &str) -> Result<Vec<String>, SendError> {
        self.log.push(Event::Cleanup {
            destination: self.id.clone(),
            source: source_id.to_string(),
        });
        if let Some(ref message) = self.cleanup_failure {
            return Err(SendError::Failed(message.clone()));
        }
        Ok((0..self.retained)
            .map(|i| format!("mock://{}/{}/kept-{}", self.id, source_id, i))
            .collect())
    }
}

/// Notification that records every signal it acts on
pub struct RecordingNotification {
    id: String,
    log: EventLog,
    triggers: NotifyTriggers,
}

impl RecordingNotification {
    /// Acts on every signal
    pub fn new(id: &str, log: &EventLog) -> Self {
        Self {
            id: id.to_string(),
            log: log.clone(),
            triggers: NotifyTriggers {
                on_start: true,
                on_success: true,
                on_failure: true,
            },
        }
    }

    pub fn with_triggers(mut self, triggers: NotifyTriggers) -> Self {
        self.triggers = triggers;
        self
    }
}

impl BackupNotification for RecordingNotification {
    fn id(&self) -> &str {
        &self.id
    }

    fn triggers(&self) -> NotifyTriggers {
        self.triggers
    }

    fn send_start(&self, source: &SourceInfo, _hostname: &str) -> Result<(), NotificationError> {
        self.log.push(Event::Start {
            notifier: self.id.clone(),
            source: source.id.clone(),
        });
        Ok(())
    }

    fn send_success(
        &self,
        source: &SourceInfo,
        _hostname: &str,
        filename: &Path,
        stats: &RunStatistics,
    ) -> Result<(), NotificationError> {
        self.log.push(Event::Success {
            notifier: self.id.clone(),
            source: source.id.clone(),
            file: filename.to_path_buf(),
            stats: stats.clone(),
        });
        Ok(())
    }

    fn send_failure(&self, source: &SourceInfo, _hostname: &str, error: &RunError) -> Result<(), NotificationError> {
        self.log.push(Event::Failure {
            notifier: self.id.clone(),
            source: source.id.clone(),
            error: error.to_string(),
        });
        Ok(())
    }
}
