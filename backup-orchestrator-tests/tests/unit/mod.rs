//! Unit tests for backup-orchestrator
//!
//! Configuration loading and adapter construction, no backups run.

mod config;
mod registry;
