//! Adapter registry
//!
//! Maps `type` tags to adapter constructors. The registry is built from the
//! enabled module identifiers (`sources.mysql`, `destinations.s3`, ...) and is
//! passed explicitly into bootstrap; nothing registers itself globally.

use crate::config::{AdapterConfig, Config, ConfigError};
use crate::destinations::{self, BackupDestination};
use crate::notifications::{self, BackupNotification};
use crate::sources::{self, BackupSource};
use crate::utils::CommandExecutor;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Every module identifier this build knows how to enable
pub const KNOWN_MODULES: &[&str] = &[
    "sources.mysql",
    "sources.command",
    "destinations.s3",
    "destinations.local",
    "notifications.prometheus",
    "notifications.discord",
];

pub type SourceConstructor =
    fn(&AdapterConfig, &AdapterContext) -> Result<Box<dyn BackupSource>, ConfigError>;
pub type DestinationConstructor =
    fn(&AdapterConfig, &AdapterContext) -> Result<Box<dyn BackupDestination>, ConfigError>;
pub type NotificationConstructor =
    fn(&AdapterConfig, &AdapterContext) -> Result<Box<dyn BackupNotification>, ConfigError>;

/// Shared state handed to every adapter constructor
#[derive(Clone)]
pub struct AdapterContext {
    pub executor: Arc<dyn CommandExecutor>,
    /// Fixed start of the run; destinations derive their run stamp from it
    pub run_time: DateTime<Local>,
}

impl AdapterContext {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            run_time: Local::now(),
        }
    }

    pub fn with_run_time(mut self, run_time: DateTime<Local>) -> Self {
        self.run_time = run_time;
        self
    }
}

#[derive(Default)]
pub struct AdapterRegistry {
    sources: HashMap<String, SourceConstructor>,
    destinations: HashMap<String, DestinationConstructor>,
    notifications: HashMap<String, NotificationConstructor>,
}

impl AdapterRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the given modules enabled; unknown identifiers are logged and skipped
    pub fn with_modules<S: AsRef<str>>(modules: &[S]) -> Self {
        let mut registry = Self::new();
        for module in modules {
            let module = module.as_ref();
            if registry.enable_module(module) {
                debug!("Enabled module '{}'", module);
            } else {
                error!("Unknown module '{}', skipping", module);
            }
        }
        registry
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_modules(&config.effective_modules())
    }

    /// Register the adapter a module identifier provides
    pub fn enable_module(&mut self, module: &str) -> bool {
        match module {
            "sources.mysql" => self.register_source(sources::mysql::TYPE_TAG, sources::MySqlSource::construct),
            "sources.command" => {
                self.register_source(sources::command::TYPE_TAG, sources::CommandSource::construct)
            }
            "destinations.s3" => self.register_destination(
                destinations::s3::TYPE_TAG,
                destinations::S3Destination::construct,
            ),
            "destinations.local" => self.register_destination(
                destinations::local::TYPE_TAG,
                destinations::LocalDestination::construct,
            ),
            "notifications.prometheus" => self.register_notification(
                notifications::prometheus::TYPE_TAG,
                notifications::PrometheusNotification::construct,
            ),
            "notifications.discord" => self.register_notification(
                notifications::discord::TYPE_TAG,
                notifications::DiscordNotification::construct,
            ),
            _ => return false,
        }
        true
    }

    pub fn register_source(&mut self, tag: &str, constructor: SourceConstructor) {
        self.sources.insert(tag.to_string(), constructor);
    }

    pub fn register_destination(&mut self, tag: &str, constructor: DestinationConstructor) {
        self.destinations.insert(tag.to_string(), constructor);
    }

    pub fn register_notification(&mut self, tag: &str, constructor: NotificationConstructor) {
        self.notifications.insert(tag.to_string(), constructor);
    }

    pub fn has_source(&self, tag: &str) -> bool {
        self.sources.contains_key(tag)
    }

    pub fn has_destination(&self, tag: &str) -> bool {
        self.destinations.contains_key(tag)
    }

    pub fn has_notification(&self, tag: &str) -> bool {
        self.notifications.contains_key(tag)
    }

    /// Instantiate source entries in declaration order
    pub fn build_sources(
        &self,
        entries: &[AdapterConfig],
        context: &AdapterContext,
    ) -> Result<Vec<Box<dyn BackupSource>>, ConfigError> {
        build_all("source", &self.sources, entries, context)
    }

    pub fn build_destinations(
        &self,
        entries: &[AdapterConfig],
        context: &AdapterContext,
    ) -> Result<Vec<Box<dyn BackupDestination>>, ConfigError> {
        build_all("destination", &self.destinations, entries, context)
    }

    pub fn build_notifications(
        &self,
        entries: &[AdapterConfig],
        context: &AdapterContext,
    ) -> Result<Vec<Box<dyn BackupNotification>>, ConfigError> {
        build_all("notification", &self.notifications, entries, context)
    }
}

fn build_all<T: ?Sized>(
    kind: &str,
    constructors: &HashMap<String, fn(&AdapterConfig, &AdapterContext) -> Result<Box<T>, ConfigError>>,
    entries: &[AdapterConfig],
    context: &AdapterContext,
) -> Result<Vec<Box<T>>, ConfigError> {
    let mut adapters = Vec::with_capacity(entries.len());
    for entry in entries {
        match constructors.get(&entry.adapter_type) {
            Some(construct) => adapters.push(construct(entry, context)?),
            None => warn!(
                "No {} adapter registered for type '{}' (id: {}), skipping",
                kind,
                entry.adapter_type,
                entry.id().unwrap_or("<unnamed>")
            ),
        }
    }
    Ok(adapters)
}
