//! Notification adapters report run outcomes to external channels
//!
//! Adapters implement the fallible `send_*` methods; the orchestrator only calls
//! the provided `notify_*` wrappers, which apply the adapter's triggers and log
//! any [`NotificationError`] instead of propagating it.

pub mod discord;
pub mod prometheus;

use crate::managers::run::RunError;
use crate::managers::stats::RunStatistics;
use crate::sources::SourceInfo;
use std::path::Path;
use tracing::{debug, error};

pub use discord::DiscordNotification;
pub use prometheus::PrometheusNotification;

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} responded with status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Statistic '{0}' was not recorded")]
    MissingStatistic(&'static str),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Which signals an adapter acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyTriggers {
    pub on_start: bool,
    pub on_success: bool,
    pub on_failure: bool,
}

/// A channel reporting run outcomes
pub trait BackupNotification {
    fn id(&self) -> &str;

    fn triggers(&self) -> NotifyTriggers;

    fn send_start(&self, _source: &SourceInfo, _hostname: &str) -> Result<(), NotificationError> {
        Ok(())
    }

    fn send_success(
        &self,
        source: &SourceInfo,
        hostname: &str,
        filename: &Path,
        stats: &RunStatistics,
    ) -> Result<(), NotificationError>;

    fn send_failure(
        &self,
        source: &SourceInfo,
        hostname: &str,
        error: &RunError,
    ) -> Result<(), NotificationError>;

    fn notify_start(&self, source: &SourceInfo, hostname: &str) {
        if !self.triggers().on_start {
            debug!("{}: start notification not enabled, skipping", self.id());
            return;
        }
        if let Err(e) = self.send_start(source, hostname) {
            error!("{}: start notification for '{}' failed: {}", self.id(), source.id, e);
        }
    }

    fn notify_success(&self, source: &SourceInfo, hostname: &str, filename: &Path, stats: &RunStatistics) {
        if !self.triggers().on_success {
            debug!("{}: success notification not enabled, skipping", self.id());
            return;
        }
        if let Err(e) = self.send_success(source, hostname, filename, stats) {
            error!("{}: success notification for '{}' failed: {}", self.id(), source.id, e);
        }
    }

    fn notify_failure(&self, source: &SourceInfo, hostname: &str, error: &RunError) {
        if !self.triggers().on_failure {
            debug!("{}: failure notification not enabled, skipping", self.id());
            return;
        }
        if let Err(e) = self.send_failure(source, hostname, error) {
            error!("{}: failure notification for '{}' failed: {}", self.id(), source.id, e);
        }
    }
}

/// Prefix `http://` when a URL has no scheme
pub(crate) fn with_scheme(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}
