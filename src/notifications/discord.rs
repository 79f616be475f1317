//! Discord webhook notification
//!
//! Sends an embed per backup event to a Discord channel webhook.

use super::{BackupNotification, NotificationError, NotifyTriggers};
use crate::config::{AdapterConfig, ConfigError};
use crate::managers::registry::AdapterContext;
use crate::managers::run::RunError;
use crate::managers::stats::RunStatistics;
use crate::sources::SourceInfo;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const TYPE_TAG: &str = "discord";

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordSettings {
    #[serde(default)]
    pub id: Option<String>,

    pub webhook_url: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default)]
    pub notify_on_start: bool,

    #[serde(default)]
    pub notify_on_success: bool,

    #[serde(default = "default_true")]
    pub notify_on_failure: bool,
}

fn default_username() -> String { "Backup Orchestrator".to_string() }
fn default_true() -> bool { true }

/// Discord embed color codes (decimal)
#[derive(Debug, Clone, Copy)]
enum EmbedColor {
    /// Red - for failures
    Failure = 15158332,    // #E74C3C
    /// Green - for success
    Success = 3066993,     // #2ECC71
    /// Blue - for started runs
    Info = 3447003,        // #3498DB
}

impl EmbedColor {
    fn as_decimal(&self) -> u32 {
        *self as u32
    }
}

/// Discord webhook payload
#[derive(Debug, Serialize)]
struct DiscordPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<DiscordField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<DiscordFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

#[derive(Debug, Serialize)]
struct DiscordField {
    name: String,
    value: String,
    inline: bool,
}

impl DiscordField {
    fn inline(name: &str, value: String) -> Self {
        Self {
            name: name.to_string(),
            value,
            inline: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct DiscordFooter {
    text: String,
}

pub struct DiscordNotification {
    id: String,
    settings: DiscordSettings,
}

impl DiscordNotification {
    pub fn new(settings: DiscordSettings) -> Self {
        let id = settings.id.clone().unwrap_or_else(|| TYPE_TAG.to_string());
        Self { id, settings }
    }

    /// Registry constructor
    pub fn construct(
        config: &AdapterConfig,
        _context: &AdapterContext,
    ) -> Result<Box<dyn BackupNotification>, ConfigError> {
        let settings: DiscordSettings = config.parse()?;
        Ok(Box::new(Self::new(settings)))
    }

    fn build_payload(
        &self,
        color: EmbedColor,
        title: String,
        description: String,
        fields: Vec<DiscordField>,
    ) -> DiscordPayload {
        let embed = DiscordEmbed {
            title,
            description: Some(description),
            color: color.as_decimal(),
            fields,
            footer: Some(DiscordFooter {
                text: "backup-orchestrator".to_string(),
            }),
            timestamp: Some(chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        };

        DiscordPayload {
            username: Some(self.settings.username.clone()),
            embeds: vec![embed],
        }
    }

    fn success_payload(
        &self,
        source: &SourceInfo,
        hostname: &str,
        filename: &Path,
        stats: &RunStatistics,
    ) -> DiscordPayload {
        let mut fields = source_fields(source, hostname);
        fields.push(DiscordField::inline("Size", stats.size_description()));
        if let Some(dump_time) = stats.dump_time {
            fields.push(DiscordField::inline("Dump time", format_duration(dump_time.as_secs())));
        }
        if let Some(upload_time) = stats.upload_time {
            fields.push(DiscordField::inline("Upload time", format_duration(upload_time.as_secs())));
        }
        fields.push(DiscordField {
            name: "File".to_string(),
            value: filename.display().to_string(),
            inline: false,
        });
        if !stats.dumped_files.is_empty() {
            fields.push(DiscordField {
                name: "Stored at".to_string(),
                value: stats.dumped_files.join("\n"),
                inline: false,
            });
        }

        self.build_payload(
            EmbedColor::Success,
            format!("\u{2705} Backup succeeded: {}", source.name),
            format!("Backup completed successfully for source '{}'", source.id),
            fields,
        )
    }

    fn failure_payload(&self, source: &SourceInfo, hostname: &str, error: &RunError) -> DiscordPayload {
        let mut fields = source_fields(source, hostname);

        // Truncate error message if too long
        let error = error.to_string();
        let error_display = if error.chars().count() > 500 {
            format!("{}...", error.chars().take(497).collect::<String>())
        } else {
            error
        };
        fields.push(DiscordField {
            name: "Error".to_string(),
            value: format!("```\n{}\n```", error_display),
            inline: false,
        });

        self.build_payload(
            EmbedColor::Failure,
            format!("\u{274C} Backup failed: {}", source.name),
            format!("Backup failed for source '{}'", source.id),
            fields,
        )
    }

    /// Send webhook to Discord
    fn send_webhook(&self, payload: &DiscordPayload) -> Result<(), NotificationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let response = client
            .post(&self.settings.webhook_url)
            .json(payload)
            .send()?;

        let status = response.status();
        if status.is_success() {
            debug!("Discord webhook sent successfully");
            Ok(())
        } else {
            let body = response.text().unwrap_or_default();
            Err(NotificationError::Status {
                endpoint: "Discord webhook".to_string(),
                status: status.as_u16(),
                body,
            })
        }
    }
}

impl BackupNotification for DiscordNotification {
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

    fn send_start(&self, source: &SourceInfo, hostname: &str) -> Result<(), NotificationError> {
        let payload = self.build_payload(
            EmbedColor::Info,
            format!("\u{23F0} Backup started: {}", source.name),
            format!("Backing up source '{}'", source.id),
            source_fields(source, hostname),
        );
        self.send_webhook(&payload)
    }

    fn send_success(
        &self,
        source: &SourceInfo,
        hostname: &str,
        filename: &Path,
        stats: &RunStatistics,
    ) -> Result<(), NotificationError> {
        self.send_webhook(&self.success_payload(source, hostname, filename, stats))?;
        info!("Sent success notification for source '{}'", source.id);
        Ok(())
    }

    fn send_failure(&self, source: &SourceInfo, hostname: &str, error: &RunError) -> Result<(), NotificationError> {
        self.send_webhook(&self.failure_payload(source, hostname, error))?;
        info!("Sent failure notification for source '{}'", source.id);
        Ok(())
    }
}

fn source_fields(source: &SourceInfo, hostname: &str) -> Vec<DiscordField> {
    vec![
        DiscordField::inline("Source", format!("{} ({})", source.name, source.source_type)),
        DiscordField::inline("Host", hostname.to_string()),
    ]
}

/// Format duration in human-readable form
fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        let minutes = seconds / 60;
        let secs = seconds % 60;
        if secs == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}m {}s", minutes, secs)
        }
    } else {
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        if minutes == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, minutes)
        }
    }
}
