//! Run orchestrator - drives each source through dump, upload and notification

use super::registry::{AdapterContext, AdapterRegistry};
use super::stats::RunStatistics;
use crate::config::{Config, ConfigError};
use crate::destinations::{BackupDestination, SendError};
use crate::notifications::BackupNotification;
use crate::sources::{BackupSource, DumpError, SourceInfo};
use crate::utils::Interrupt;
use chrono::Local;
use std::error::Error as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Why a single source's backup was abandoned
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Dump(#[from] DumpError),

    #[error(transparent)]
    Send(#[from] SendError),

    #[error("Failed to read size of dump file {path:?}: {source}")]
    Size {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source produced no dump files")]
    NoDumpFiles,

    #[error("Backup interrupted")]
    Interrupted,
}

/// Outcome of one source
#[derive(Debug)]
pub struct SourceReport {
    pub source: SourceInfo,
    /// The last dump file on success
    pub outcome: Result<PathBuf, RunError>,
    pub stats: RunStatistics,
}

impl SourceReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Outcome of a whole run, in source order
#[derive(Debug, Default)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
    /// Set when an interrupt stopped the run early
    pub interrupted: bool,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.sources.iter().filter(|r| r.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.sources.len() - self.succeeded()
    }
}

pub struct RunOrchestrator {
    hostname: String,
    sources: Vec<Box<dyn BackupSource>>,
    destinations: Vec<Box<dyn BackupDestination>>,
    notifications: Vec<Box<dyn BackupNotification>>,
    interrupt: Interrupt,
}

impl RunOrchestrator {
    pub fn new(
        hostname: String,
        sources: Vec<Box<dyn BackupSource>>,
        destinations: Vec<Box<dyn BackupDestination>>,
        notifications: Vec<Box<dyn BackupNotification>>,
    ) -> Self {
        Self {
            hostname,
            sources,
            destinations,
            notifications,
            interrupt: Interrupt::new(),
        }
    }

    /// Stop the run once `interrupt` fires
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Instantiate every configured adapter through the registry
    pub fn from_config(
        config: &Config,
        registry: &AdapterRegistry,
        context: &AdapterContext,
    ) -> Result<Self, ConfigError> {
        let sources = registry.build_sources(&config.sources, context)?;
        if sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let destinations = registry.build_destinations(&config.destinations, context)?;
        let notifications = registry.build_notifications(&config.notifications, context)?;

        if destinations.is_empty() {
            warn!("No destinations configured, dumps will not be stored anywhere");
        }
        info!(
            "Loaded {} source(s), {} destination(s), {} notification(s)",
            sources.len(),
            destinations.len(),
            notifications.len()
        );

        Ok(Self::new(detect_hostname(), sources, destinations, notifications))
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Back up every source once, in declaration order
    ///
    /// A failing source never stops the run; its error is reported to the
    /// notifications and recorded in the returned report. An interrupt stops
    /// the run after the current source has removed its dump, and nobody is
    /// notified about the interrupted source.
    pub fn run(&self) -> RunReport {
        let mut report = RunReport::default();
        for source in &self.sources {
            if self.interrupt.is_triggered() {
                break;
            }
            report.sources.push(self.run_source(source.as_ref()));
        }

        if self.interrupt.is_triggered() {
            info!("Run interrupted after {} source(s)", report.sources.len());
            report.interrupted = true;
            return report;
        }

        info!(
            "Backup summary: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }

    fn run_source(&self, source: &dyn BackupSource) -> SourceReport {
        let info = source.info();
        info!("Starting backup for source '{}' ({})", info.id, info.source_type);

        for notification in &self.notifications {
            notification.notify_start(info, &self.hostname);
        }

        let mut stats = RunStatistics::new();
        let mut last_dump = None;
        let outcome = self.process(source, &mut stats, &mut last_dump);

        match outcome {
            Ok(ref file) => {
                info!(
                    "Backup of '{}' completed: {} in {} file(s)",
                    info.id,
                    stats.size_description(),
                    stats.dumped_files.len()
                );
                for notification in &self.notifications {
                    notification.notify_success(info, &self.hostname, file, &stats);
                }
            }
            Err(_) if self.interrupt.is_triggered() => {
                info!("Backup of '{}' interrupted", info.id);
            }
            Err(ref e) => {
                error!("Backup of '{}' failed: {}", info.id, error_chain(e));
                for notification in &self.notifications {
                    notification.notify_failure(info, &self.hostname, e);
                }
            }
        }

        if let Some(ref path) = last_dump {
            remove_dump(path);
        }

        SourceReport {
            source: info.clone(),
            outcome,
            stats,
        }
    }

    /// Dump, measure and fan out to every destination
    ///
    /// `last_dump` tracks the most recently referenced dump file so the caller
    /// can remove it whatever the outcome.
    fn process(
        &self,
        source: &dyn BackupSource,
        stats: &mut RunStatistics,
        last_dump: &mut Option<PathBuf>,
    ) -> Result<PathBuf, RunError> {
        let info = source.info();

        stats.start_time = Some(Local::now());
        let started = Instant::now();
        let files = source.dump()?;
        stats.dump_time = Some(started.elapsed());
        debug!("Dump of '{}' produced {:?}", info.id, files);

        if files.is_empty() {
            return Err(RunError::NoDumpFiles);
        }

        let mut size = 0;
        for file in &files {
            *last_dump = Some(file.clone());
            let metadata = fs::metadata(file).map_err(|source| RunError::Size {
                path: file.clone(),
                source,
            })?;
            size += metadata.len();
        }
        stats.size = Some(size);

        let upload_started = Instant::now();
        for file in &files {
            *last_dump = Some(file.clone());
            for destination in &self.destinations {
                if self.interrupt.is_triggered() {
                    return Err(RunError::Interrupted);
                }
                let location = destination.send(&info.id, &info.name, file)?;
                debug!("Sent {:?} to {} as {}", file, destination.id(), location);
                stats.dumped_files.push(location);

                let retained = destination.cleanup(&info.id, &info.name)?;
                stats.retained_files.extend(retained);
            }
        }
        stats.end_time = Some(Local::now());
        stats.upload_time = Some(upload_started.elapsed());

        // files is non-empty here
        Ok(files[files.len() - 1].clone())
    }
}

fn remove_dump(path: &Path) {
    if !path.is_file() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed dump file {:?}", path),
        Err(e) => warn!("Failed to remove dump file {:?}: {}", path, e),
    }
}

/// Render an error with its causes, skipping causes already quoted by their parent
pub fn error_chain(error: &RunError) -> String {
    let mut rendered = error.to_string();
    let mut cause = error.source();
    while let Some(e) = cause {
        let message = e.to_string();
        if !rendered.contains(&message) {
            rendered.push_str(": ");
            rendered.push_str(&message);
        }
        cause = e.source();
    }
    rendered
}

/// Name of this machine for notifications
pub fn detect_hostname() -> String {
    match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            warn!("Could not determine hostname: {}", e);
            "localhost".to_string()
        }
    }
}
