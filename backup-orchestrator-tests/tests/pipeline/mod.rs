//! Pipeline tests for backup-orchestrator
//!
//! These tests drive whole runs through the orchestrator using recording
//! adapters, the mocked command executor and the local filesystem.

mod adapters;
mod run;
