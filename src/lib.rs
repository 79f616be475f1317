//! Backup Orchestrator Library
//!
//! Configuration-driven backups: sources dump, destinations store and prune,
//! notifications report each outcome.

pub mod config;
pub mod destinations;
pub mod managers;
pub mod notifications;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, Config};
pub use managers::logging::{init_logging, LogGuard, LoggingConfig, Verbosity};
pub use managers::registry::{AdapterContext, AdapterRegistry};
pub use managers::run::{RunError, RunOrchestrator, RunReport};
pub use managers::stats::RunStatistics;
