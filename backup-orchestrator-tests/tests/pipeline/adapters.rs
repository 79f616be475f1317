//! Whole runs through registry-built adapters

use backup_orchestrator::config::Config;
use backup_orchestrator::notifications::BackupNotification;
use backup_orchestrator::utils::RealExecutor;
use backup_orchestrator::RunOrchestrator;
use std::fs;
use std::sync::Arc;
use test_utils::{
    orchestrator, run_time, write_dump, AdapterContext, AdapterRegistry, BackupDestination, CommandExecutor,
    ConfigBuilder, EventLog, MockExecutor, MockResponse, RecordingNotification, RUN_STAMP,
};

/// Registry-built sources and destinations plus a recording notification
fn build(config: &Config, executor: Arc<dyn CommandExecutor>, log: &EventLog) -> RunOrchestrator {
    let registry = AdapterRegistry::from_config(config);
    let context = AdapterContext::new(executor).with_run_time(run_time());
    let notifications: Vec<Box<dyn BackupNotification>> =
        vec![Box::new(RecordingNotification::new("recorder", log))];

    orchestrator(
        registry.build_sources(&config.sources, &context).unwrap(),
        registry.build_destinations(&config.destinations, &context).unwrap(),
        notifications,
    )
}

#[cfg(unix)]
#[test]
fn test_command_source_to_local_destination() {
    let builder = ConfigBuilder::local()
        .command_source("files", "head -c 1024 /dev/zero")
        .local_destination("nas", 2);
    let log = EventLog::new();

    let report = build(&builder.build(), Arc::new(RealExecutor::new()), &log).run();

    assert_eq!(log.kinds(), vec!["start", "success"]);
    let stats = &log.success_stats()[0];
    assert_eq!(stats.size, Some(1024));
    assert_eq!(stats.dumped_files.len(), 1);
    assert!(stats.dumped_files[0].contains("files"));
    assert!(stats.dumped_files[0].ends_with("files.dump"));
    assert_eq!(stats.retained_files, stats.dumped_files);

    let stored = builder.backup_dir().join("files").join(RUN_STAMP).join("files.dump");
    assert_eq!(fs::metadata(&stored).unwrap().len(), 1024);

    // the local dump is gone once the source is done
    assert!(!builder.tmp_dir().join("files.dump").exists());
    assert_eq!(report.succeeded(), 1);
}

#[cfg(unix)]
#[test]
fn test_failing_command_source_reports_stderr() {
    let builder = ConfigBuilder::local()
        .command_source("broken", "echo 'disk full' >&2; exit 3")
        .local_destination("nas", 2);
    let log = EventLog::new();

    let report = build(&builder.build(), Arc::new(RealExecutor::new()), &log).run();

    assert_eq!(log.kinds(), vec!["start", "failure"]);
    assert!(log.failure_errors()[0].contains("disk full"));
    assert!(!builder.tmp_dir().join("broken.dump").exists());
    assert_eq!(report.failed(), 1);
    // nothing reached the destination
    assert!(!builder.backup_dir().join("broken").exists());
}

#[test]
fn test_repeated_local_sends_share_a_location() {
    let builder = ConfigBuilder::local().local_destination("nas", 2);
    let config = builder.build();
    let registry = AdapterRegistry::from_config(&config);
    let context = AdapterContext::new(Arc::new(MockExecutor::new())).with_run_time(run_time());
    let destinations = registry.build_destinations(&config.destinations, &context).unwrap();
    let dump = write_dump(&builder.tmp_dir(), "shop.sql", 16);

    let first = destinations[0].send("shop", "Shop", &dump).unwrap();
    let second = destinations[0].send("shop", "Shop", &dump).unwrap();

    assert_eq!(first, second);
    assert!(first.contains("shop"));
    assert!(first.contains(RUN_STAMP));
    assert!(first.ends_with("shop.sql"));
}

#[test]
fn test_mysql_to_s3_with_mocked_tools() {
    let builder = ConfigBuilder::new()
        .mysql_source("shop", "shop")
        .s3_destination("offsite", "backups");
    let executor = MockExecutor::new()
        .expect("mysqldump", MockResponse::stdout("-- dump"))
        .expect("ls --recursive", MockResponse::stdout(&format!(
            "2024-03-01 02:00:05          7 shop/{}/shop.sql\n",
            RUN_STAMP
        )))
        .expect("s3 ls s3://", MockResponse::stdout(&format!("                           PRE {}/\n", RUN_STAMP)));
    let log = EventLog::new();

    let report = build(&builder.build(), Arc::new(executor.clone()), &log).run();

    assert_eq!(report.succeeded(), 1);
    let location = format!("s3://backups/shop/{}/shop.sql", RUN_STAMP);
    let stats = &log.success_stats()[0];
    assert_eq!(stats.size, Some(7));
    assert_eq!(stats.dumped_files, vec![location.clone()]);
    assert_eq!(stats.retained_files, vec![location.clone()]);

    let lines = executor.command_lines();
    assert!(lines[0].starts_with("mysqldump --defaults-file="));
    assert!(lines[0].ends_with("--databases shop"));
    assert!(lines[1].contains(&format!("cp --only-show-errors {}", builder.tmp_dir().join("shop.sql").display())));
    assert!(lines[1].ends_with(&location));
    assert_eq!(executor.call_count("aws"), 3);

    // credentials and dump never outlive the source
    assert!(!builder.tmp_dir().join("shop.my.cnf").exists());
    assert!(!builder.tmp_dir().join("shop.sql").exists());
}

#[test]
fn test_mysql_failure_removes_partial_dump() {
    let builder = ConfigBuilder::new()
        .mysql_source("shop", "shop")
        .s3_destination("offsite", "backups");
    let executor = MockExecutor::new().expect(
        "mysqldump",
        MockResponse::failure("mysqldump: Error 28: disk full", 2),
    );
    let log = EventLog::new();

    build(&builder.build(), Arc::new(executor.clone()), &log).run();

    assert_eq!(log.kinds(), vec!["start", "failure"]);
    assert!(log.failure_errors()[0].contains("disk full"));
    assert!(!executor.was_called("aws"));
    assert!(!builder.tmp_dir().join("shop.sql").exists());
    assert!(!builder.tmp_dir().join("shop.my.cnf").exists());
}

#[test]
fn test_missing_aws_cli_fails_the_source() {
    let builder = ConfigBuilder::new()
        .mysql_source("shop", "shop")
        .s3_destination("offsite", "backups");
    let executor = MockExecutor::new().without_program("aws");
    let log = EventLog::new();

    let report = build(&builder.build(), Arc::new(executor), &log).run();

    assert_eq!(report.failed(), 1);
    assert!(log.failure_errors()[0].contains("'aws' not found"));
    assert!(!builder.tmp_dir().join("shop.sql").exists());
}
