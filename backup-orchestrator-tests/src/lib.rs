//! Test utilities for backup-orchestrator
//!
//! This crate provides shared test utilities, recording adapters,
//! and helper functions for testing backup runs.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{EventLog, RecordingSource, RecordingNotification};
//!
//! #[test]
//! fn my_test() {
//!     let log = EventLog::new();
//!     let dir = tempfile::TempDir::new().unwrap();
//!     let source = RecordingSource::new("db1", &log).with_dump(dir.path(), "db1.sql", 1024);
//!     // ... build a RunOrchestrator and run it
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod mocks;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use mocks::{Event, EventLog, RecordingDestination, RecordingNotification, RecordingSource};

// Re-export types from the main crate for convenience
pub use backup_orchestrator::config::{AdapterConfig, Config, ConfigError};
pub use backup_orchestrator::destinations::{BackupDestination, SendError};
pub use backup_orchestrator::notifications::{BackupNotification, NotifyTriggers};
pub use backup_orchestrator::sources::{BackupSource, DumpError, SourceInfo};
pub use backup_orchestrator::utils::executor::mock::{MockExecutor, MockResponse};
pub use backup_orchestrator::utils::CommandExecutor;
pub use backup_orchestrator::{AdapterContext, AdapterRegistry, RunError, RunOrchestrator, RunStatistics};

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
