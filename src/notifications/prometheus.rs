//! Prometheus push gateway notification

use super::{with_scheme, BackupNotification, NotificationError, NotifyTriggers};
use crate::config::{AdapterConfig, ConfigError};
use crate::managers::registry::AdapterContext;
use crate::managers::run::RunError;
use crate::managers::stats::RunStatistics;
use crate::sources::SourceInfo;
use chrono::Utc;
use reqwest::{Method, Url};
use serde::Deserialize;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const TYPE_TAG: &str = "prometheus";

const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, Clone, Deserialize)]
pub struct PrometheusSettings {
    #[serde(default)]
    pub id: Option<String>,

    /// Push gateway base URL
    pub url: String,

    #[serde(default)]
    pub credentials: Option<BasicCredentials>,

    #[serde(default)]
    pub notify_on_start: bool,

    #[serde(default = "default_true")]
    pub notify_on_success: bool,

    #[serde(default)]
    pub notify_on_failure: bool,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

fn default_true() -> bool { true }
fn default_timeout() -> u64 { 30 }

pub struct PrometheusNotification {
    id: String,
    settings: PrometheusSettings,
}

impl PrometheusNotification {
    pub fn new(settings: PrometheusSettings) -> Self {
        let id = settings.id.clone().unwrap_or_else(|| TYPE_TAG.to_string());
        Self { id, settings }
    }

    /// Registry constructor
    pub fn construct(
        config: &AdapterConfig,
        _context: &AdapterContext,
    ) -> Result<Box<dyn BackupNotification>, ConfigError> {
        let settings: PrometheusSettings = config.parse()?;
        Ok(Box::new(Self::new(settings)))
    }

    /// Grouping key URL for a job, the job percent-encoded as one path segment
    fn job_endpoint(&self, job: &str) -> Result<Url, NotificationError> {
        let invalid = |reason: String| NotificationError::InvalidUrl {
            url: self.settings.url.clone(),
            reason,
        };

        let mut endpoint = Url::parse(&with_scheme(&self.settings.url)).map_err(|e| invalid(e.to_string()))?;
        endpoint
            .path_segments_mut()
            .map_err(|_| invalid("not a base URL".to_string()))?
            .pop_if_empty()
            .extend(["metrics", "job", job]);
        Ok(endpoint)
    }

    /// Push metrics for a job
    ///
    /// `PUT` replaces the job's whole metric group, `POST` only the metrics
    /// with the same names.
    fn push(&self, method: Method, job: &str, body: String) -> Result<(), NotificationError> {
        let endpoint = self.job_endpoint(job)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.settings.timeout_seconds))
            .build()?;

        let mut request = client
            .request(method, endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(body);
        if let Some(ref credentials) = self.settings.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let response = request.send()?;
        let status = response.status();
        if status.is_success() {
            info!("Pushed metrics for job '{}' to gateway ({})", job, self.settings.url);
            Ok(())
        } else {
            let body = response.text().unwrap_or_default();
            Err(NotificationError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            })
        }
    }
}

impl BackupNotification for PrometheusNotification {
    fn id(&self) -> &str {
        &self.id
    }

    fn triggers(&self) -> NotifyTriggers {
        NotifyTriggers {
            on_start: self.settings.notify_on_start,
            on_success: self.settings.notify_on_success,
            on_failure: self.settings.notify_on_failure,
        }
    }

    fn send_start(&self, source: &SourceInfo, _hostname: &str) -> Result<(), NotificationError> {
        let mut body = String::new();
        write_gauge(
            &mut body,
            "backup_start_timestamp",
            "Time backup started as seconds-since-the-epoch",
            Utc::now().timestamp() as f64,
        );
        // Keep the last run's success metrics in the group
        self.push(Method::POST, &source.id, body)
    }

    fn send_success(
        &self,
        source: &SourceInfo,
        _hostname: &str,
        _filename: &Path,
        stats: &RunStatistics,
    ) -> Result<(), NotificationError> {
        let body = success_metrics(stats, Utc::now().timestamp())?;
        debug!("Metrics for job '{}':\n{}", source.id, body);
        self.push(Method::PUT, &source.id, body)
    }

    fn send_failure(
        &self,
        source: &SourceInfo,
        _hostname: &str,
        _error: &RunError,
    ) -> Result<(), NotificationError> {
        let mut body = String::new();
        write_gauge(
            &mut body,
            "backup_failure_timestamp",
            "Time backup failed as seconds-since-the-epoch",
            Utc::now().timestamp() as f64,
        );
        self.push(Method::POST, &source.id, body)
    }
}

/// Text exposition of a successful run
fn success_metrics(stats: &RunStatistics, completed_at: i64) -> Result<String, NotificationError> {
    let size = stats.size.ok_or(NotificationError::MissingStatistic("size"))?;
    let dump_time = stats
        .dump_time
        .ok_or(NotificationError::MissingStatistic("dump_time"))?;
    let upload_time = stats
        .upload_time
        .ok_or(NotificationError::MissingStatistic("upload_time"))?;

    let mut body = String::new();
    write_summary(&mut body, "backup_size", "Size of backup file in bytes", size as f64);
    write_summary(
        &mut body,
        "backup_dumptime",
        "Time taken to dump in seconds",
        dump_time.as_secs_f64(),
    );
    write_summary(
        &mut body,
        "backup_uploadtime",
        "Time taken to upload backup in seconds",
        upload_time.as_secs_f64(),
    );
    write_gauge(
        &mut body,
        "backup_timestamp",
        "Time backup completed as seconds-since-the-epoch",
        completed_at as f64,
    );
    Ok(body)
}

/// A summary holding one observation
fn write_summary(body: &mut String, name: &str, help: &str, value: f64) {
    let _ = writeln!(body, "# HELP {} {}", name, help);
    let _ = writeln!(body, "# TYPE {} summary", name);
    let _ = writeln!(body, "{}_count 1", name);
    let _ = writeln!(body, "{}_sum {}", name, value);
}

fn write_gauge(body: &mut String, name: &str, help: &str, value: f64) {
    let _ = writeln!(body, "# HELP {} {}", name, help);
    let _ = writeln!(body, "# TYPE {} gauge", name);
    let _ = writeln!(body, "{} {}", name, value);
}
