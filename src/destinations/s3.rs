//! S3-compatible object storage, driven through the `aws` CLI

use super::{
    default_retention_copies, file_base_name, format_run_timestamp, split_generations,
    BackupDestination, SendError,
};
use crate::config::{AdapterConfig, ConfigError};
use crate::managers::registry::AdapterContext;
use crate::utils::{CommandError, CommandExecutor, CommandSpec};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub const TYPE_TAG: &str = "s3";

const AWS: &str = "aws";

#[derive(Debug, Clone, Deserialize)]
pub struct S3Settings {
    #[serde(default)]
    pub id: Option<String>,

    pub bucket: String,

    pub region: String,

    /// Custom endpoint for S3-compatible services
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Static credentials; the CLI's own credential chain applies when unset
    #[serde(default)]
    pub credentials: Option<S3Credentials>,

    /// Run generations kept per source
    #[serde(default = "default_retention_copies")]
    pub retention_copies: usize,

    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Credentials {
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
}

pub struct S3Destination {
    id: String,
    settings: S3Settings,
    run_stamp: String,
    executor: Arc<dyn CommandExecutor>,
}

impl S3Destination {
    pub fn new(settings: S3Settings, run_stamp: String, executor: Arc<dyn CommandExecutor>) -> Self {
        let id = settings.id.clone().unwrap_or_else(|| TYPE_TAG.to_string());
        Self {
            id,
            settings,
            run_stamp,
            executor,
        }
    }

    /// Registry constructor
    pub fn construct(
        config: &AdapterConfig,
        context: &AdapterContext,
    ) -> Result<Box<dyn BackupDestination>, ConfigError> {
        let settings: S3Settings = config.parse()?;
        if settings.retention_copies == 0 {
            return Err(ConfigError::ValidationError(format!(
                "Destination '{}': retention_copies must be at least 1",
                settings.id.as_deref().unwrap_or(TYPE_TAG)
            )));
        }
        Ok(Box::new(Self::new(
            settings,
            format_run_timestamp(&context.run_time),
            context.executor.clone(),
        )))
    }

    fn source_prefix(&self, source_id: &str) -> String {
        format!("s3://{}/{}/", self.settings.bucket, source_id)
    }

    /// `aws s3 [--endpoint-url URL] <args>` with credentials in the environment
    fn aws(&self, program: &Path, args: &[&str]) -> CommandSpec {
        let mut spec = CommandSpec::new(program.display().to_string()).arg("s3");
        if let Some(ref endpoint) = self.settings.endpoint_url {
            spec = spec.arg("--endpoint-url").arg(endpoint.as_str());
        }
        spec = spec
            .args(args.iter().copied())
            .env("AWS_DEFAULT_REGION", self.settings.region.as_str())
            .timeout(self.settings.timeout_seconds.map(Duration::from_secs));
        if let Some(ref credentials) = self.settings.credentials {
            spec = spec
                .env("AWS_ACCESS_KEY_ID", credentials.aws_access_key_id.as_str())
                .env("AWS_SECRET_ACCESS_KEY", credentials.aws_secret_access_key.as_str());
        }
        spec
    }

    fn aws_binary(&self) -> Result<std::path::PathBuf, SendError> {
        self.executor
            .locate(AWS)
            .ok_or_else(|| SendError::MissingTool(AWS.to_string()))
    }

    fn command_error(&self, source: CommandError) -> SendError {
        SendError::Command {
            destination: self.id.clone(),
            source,
        }
    }

    /// Run generations stored under a source prefix
    fn list_generations(&self, program: &Path, prefix: &str) -> Result<Vec<String>, SendError> {
        let listing = self
            .executor
            .run_stdout(&self.aws(program, &["ls", prefix]))
            .map_err(|e| self.command_error(e))?;
        Ok(parse_prefix_listing(&listing))
    }
}

impl BackupDestination for S3Destination {
    fn id(&self) -> &str {
        &self.id
    }

    fn send(&self, source_id: &str, source_name: &str, file: &Path) -> Result<String, SendError> {
        let program = self.aws_binary()?;
        let location = format!(
            "{}{}/{}",
            self.source_prefix(source_id),
            self.run_stamp,
            file_base_name(file)?
        );
        info!(
            "Uploading '{}' backup for '{}' to S3 ({})...",
            source_name, self.id, location
        );

        let file_arg = file.display().to_string();
        let spec = self.aws(&program, &["cp", "--only-show-errors", &file_arg, &location]);
        self.executor
            .run(&spec)
            .map_err(|e| self.command_error(e))?;

        Ok(location)
    }

    fn cleanup(&self, source_id: &str, source_name: &str) -> Result<Vec<String>, SendError> {
        let program = self.aws_binary()?;
        let prefix = self.source_prefix(source_id);

        let generations = self.list_generations(&program, &prefix)?;
        let (kept, expired) = split_generations(generations, self.settings.retention_copies);
        debug!(
            "S3 ({}) holds {} generation(s) for '{}', {} expired",
            self.id,
            kept.len() + expired.len(),
            source_name,
            expired.len()
        );

        for generation in &expired {
            let target = format!("{}{}/", prefix, generation);
            info!("Removing expired backup {} for '{}'", target, source_name);
            let spec = self.aws(&program, &["rm", "--recursive", "--only-show-errors", &target]);
            self.executor
                .run(&spec)
                .map_err(|e| self.command_error(e))?;
        }

        let listing = self
            .executor
            .run_stdout(&self.aws(&program, &["ls", "--recursive", &prefix]))
            .map_err(|e| self.command_error(e))?;

        // Keys are `<source_id>/<generation>/<file>`; the id may itself contain '/'
        let key_prefix = format!("{}/", source_id);
        Ok(parse_object_listing(&listing)
            .into_iter()
            .filter(|key| {
                key.strip_prefix(&key_prefix)
                    .and_then(|rest| rest.split('/').next())
                    .is_some_and(|generation| kept.iter().any(|k| k == generation))
            })
            .map(|key| format!("s3://{}/{}", self.settings.bucket, key))
            .collect())
    }
}

/// Common prefixes from `aws s3 ls s3://bucket/prefix/` (`PRE name/` lines)
fn parse_prefix_listing(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| line.trim().strip_prefix("PRE "))
        .map(|name| name.trim().trim_end_matches('/').to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Object keys from `aws s3 ls --recursive` (`date time size key` lines)
fn parse_object_listing(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| {
            // Skip date, time and size; the key may itself contain spaces
            let mut rest = line.trim();
            for _ in 0..3 {
                let end = rest.find(char::is_whitespace)?;
                rest = rest[end..].trim_start();
            }
            (!rest.is_empty()).then(|| rest.to_string())
        })
        .collect()
}
