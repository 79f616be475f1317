//! Test fixtures and sample data
//!
//! Provides pre-built test data and templates for testing.

use backup_orchestrator::destinations::BackupDestination;
use backup_orchestrator::notifications::BackupNotification;
use backup_orchestrator::sources::{BackupSource, SourceInfo};
use backup_orchestrator::RunOrchestrator;
use chrono::{DateTime, Local, TimeZone};
use std::fs;
use std::path::{Path, PathBuf};

/// Run stamp matching [`run_time`]
pub const RUN_STAMP: &str = "20240301020000";

/// Hostname every fixture orchestrator reports
pub const TEST_HOST: &str = "test-host";

/// Fixed run start used for deterministic destination paths
pub fn run_time() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2024, 3, 1, 2, 0, 0)
        .single()
        .expect("Unambiguous fixture time")
}

/// Write a dump file of `len` bytes
pub fn write_dump(dir: &Path, name: &str, len: usize) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, vec![b'x'; len]).expect("Failed to write dump file");
    path
}

pub fn source_info(id: &str) -> SourceInfo {
    SourceInfo {
        id: id.to_string(),
        name: id.to_string(),
        source_type: "mysql".to_string(),
    }
}

/// Orchestrator over already constructed adapters
pub fn orchestrator(
    sources: Vec<Box<dyn BackupSource>>,
    destinations: Vec<Box<dyn BackupDestination>>,
    notifications: Vec<Box<dyn BackupNotification>>,
) -> RunOrchestrator {
    RunOrchestrator::new(TEST_HOST.to_string(), sources, destinations, notifications)
}

/// Minimal valid JSON job description using the default modules
pub fn minimal_config_json() -> &'static str {
    r#"{
    "modules": null,
    "sources": [
        {"type": "mysql", "id": "shop", "dbhost": "db.internal", "dbname": "shop"}
    ],
    "destinations": [
        {"type": "s3", "bucket": "backups", "region": "eu-west-1"}
    ],
    "notifications": [
        {"type": "prometheus", "url": "pushgateway:9091"}
    ]
}"#
}

/// Same job description as TOML
pub fn minimal_config_toml() -> &'static str {
    r#"
[[sources]]
type = "mysql"
id = "shop"
dbhost = "db.internal"
dbname = "shop"

[[destinations]]
type = "s3"
bucket = "backups"
region = "eu-west-1"

[[notifications]]
type = "prometheus"
url = "pushgateway:9091"
"#
}
