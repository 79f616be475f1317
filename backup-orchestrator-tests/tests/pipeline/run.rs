//! Orchestrator behaviour with recording adapters

use backup_orchestrator::destinations::BackupDestination;
use backup_orchestrator::notifications::BackupNotification;
use backup_orchestrator::sources::BackupSource;
use rstest::rstest;
use std::path::PathBuf;
use tempfile::TempDir;
use test_utils::{
    orchestrator, Event, EventLog, NotifyTriggers, RecordingDestination, RecordingNotification,
    RecordingSource, RunError, TEST_HOST,
};

fn notifier(log: &EventLog) -> Vec<Box<dyn BackupNotification>> {
    vec![Box::new(RecordingNotification::new("recorder", log))]
}

#[rstest]
#[case(1)]
#[case(3)]
fn test_one_start_broadcast_per_source(#[case] count: usize) {
    let dir = TempDir::new().unwrap();
    let log = EventLog::new();
    let sources: Vec<Box<dyn BackupSource>> = (0..count)
        .map(|i| {
            let id = format!("db{}", i);
            Box::new(RecordingSource::new(&id, &log).with_dump(dir.path(), &format!("{}.sql", id), 8))
                as Box<dyn BackupSource>
        })
        .collect();
    let notifications: Vec<Box<dyn BackupNotification>> = vec![
        Box::new(RecordingNotification::new("first", &log)),
        Box::new(RecordingNotification::new("second", &log)),
    ];

    let report = orchestrator(sources, Vec::new(), notifications).run();

    assert_eq!(log.count("start"), count * 2);
    assert_eq!(report.sources.len(), count);
    assert_eq!(report.succeeded(), count);
}

#[test]
fn test_start_goes_to_every_notifier_in_order_before_dump() {
    let dir = TempDir::new().unwrap();
    let log = EventLog::new();
    let source = RecordingSource::new("db1", &log).with_dump(dir.path(), "db1.sql", 8);
    let notifications: Vec<Box<dyn BackupNotification>> = vec![
        Box::new(RecordingNotification::new("first", &log)),
        Box::new(RecordingNotification::new("second", &log)),
    ];

    orchestrator(vec![Box::new(source)], Vec::new(), notifications).run();

    let events = log.events();
    assert_eq!(
        events[0],
        Event::Start {
            notifier: "first".to_string(),
            source: "db1".to_string()
        }
    );
    assert_eq!(
        events[1],
        Event::Start {
            notifier: "second".to_string(),
            source: "db1".to_string()
        }
    );
    assert_eq!(events[2].kind(), "dump");
}

#[test]
fn test_dump_failure_skips_destinations() {
    let log = EventLog::new();
    let source = RecordingSource::new("db1", &log).failing("disk full");
    let destinations: Vec<Box<dyn BackupDestination>> =
        vec![Box::new(RecordingDestination::new("offsite", &log))];

    let report = orchestrator(vec![Box::new(source)], destinations, notifier(&log)).run();

    assert_eq!(log.kinds(), vec!["start", "dump", "failure"]);
    assert_eq!(log.count("send"), 0);
    assert_eq!(log.count("cleanup"), 0);
    assert_eq!(log.count("success"), 0);
    assert_eq!(report.failed(), 1);
}

#[test]
fn test_dump_failure_reports_exact_error() {
    let log = EventLog::new();
    let source = RecordingSource::new("db1", &log).failing("disk full");

    let report = orchestrator(vec![Box::new(source)], Vec::new(), notifier(&log)).run();

    assert_eq!(log.failure_errors(), vec!["disk full".to_string()]);
    let source_report = &report.sources[0];
    assert!(matches!(source_report.outcome, Err(RunError::Dump(_))));
    assert_eq!(source_report.stats.dump_time, None);
    assert_eq!(source_report.stats.size, None);
    assert_eq!(source_report.stats.upload_time, None);
}

#[test]
fn test_files_times_destinations_fan_out_is_file_major() {
    let dir = TempDir::new().unwrap();
    let log = EventLog::new();
    let source = RecordingSource::new("db1", &log)
        .with_dump(dir.path(), "part1.sql", 10)
        .with_dump(dir.path(), "part2.sql", 20);
    let destinations: Vec<Box<dyn BackupDestination>> = vec![
        Box::new(RecordingDestination::new("a", &log).with_retained(2)),
        Box::new(RecordingDestination::new("b", &log).with_retained(3)),
    ];

    let report = orchestrator(vec![Box::new(source)], destinations, notifier(&log)).run();

    let transfers: Vec<(String, String)> = log
        .events()
        .into_iter()
        .filter_map(|event| match event {
            Event::Send { destination, file, .. } => Some((
                format!("send {}", destination),
                file.file_name().unwrap().to_string_lossy().into_owned(),
            )),
            Event::Cleanup { destination, .. } => Some((format!("cleanup {}", destination), String::new())),
            _ => None,
        })
        .collect();
    let expected: Vec<(String, String)> = [
        ("send a", "part1.sql"),
        ("cleanup a", ""),
        ("send b", "part1.sql"),
        ("cleanup b", ""),
        ("send a", "part2.sql"),
        ("cleanup a", ""),
        ("send b", "part2.sql"),
        ("cleanup b", ""),
    ]
    .iter()
    .map(|(step, file)| (step.to_string(), file.to_string()))
    .collect();
    assert_eq!(transfers, expected);

    let stats = &report.sources[0].stats;
    assert_eq!(stats.dumped_files.len(), 4);
    // (2 + 3) survivors after each of the two files
    assert_eq!(stats.retained_files.len(), 10);
    assert_eq!(stats.size, Some(30));
    assert!(stats.upload_time.is_some());
}

#[test]
fn test_success_carries_last_file_and_statistics() {
    let dir = TempDir::new().unwrap();
    let log = EventLog::new();
    let source = RecordingSource::new("db1", &log)
        .with_dump(dir.path(), "part1.sql", 100)
        .with_dump(dir.path(), "part2.sql", 24);
    let destinations: Vec<Box<dyn BackupDestination>> =
        vec![Box::new(RecordingDestination::new("offsite", &log))];

    orchestrator(vec![Box::new(source)], destinations, notifier(&log)).run();

    let success = log
        .events()
        .into_iter()
        .find(|event| event.kind() == "success")
        .unwrap();
    match success {
        Event::Success { file, stats, .. } => {
            assert_eq!(file, dir.path().join("part2.sql"));
            assert_eq!(stats.size, Some(124));
            assert_eq!(stats.size_description(), "124.0 bytes");
            assert!(stats.dump_time.is_some());
            assert!(stats.start_time.is_some());
            assert!(stats.end_time >= stats.start_time);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn test_only_last_dump_file_is_removed() {
    let dir = TempDir::new().unwrap();
    let log = EventLog::new();
    let source = RecordingSource::new("db1", &log)
        .with_dump(dir.path(), "part1.sql", 1)
        .with_dump(dir.path(), "part2.sql", 1);

    orchestrator(vec![Box::new(source)], Vec::new(), notifier(&log)).run();

    assert!(dir.path().join("part1.sql").exists());
    assert!(!dir.path().join("part2.sql").exists());
}

#[rstest]
#[case::send(RecordingDestination::new("offsite", &EventLog::new()).failing_send("access denied"), "access denied")]
#[case::cleanup(RecordingDestination::new("offsite", &EventLog::new()).failing_cleanup("listing failed"), "listing failed")]
fn test_destination_failure_abandons_source(#[case] destination: RecordingDestination, #[case] message: &str) {
    let dir = TempDir::new().unwrap();
    let log = EventLog::new();
    let dump: PathBuf = dir.path().join("db1.sql");
    let source = RecordingSource::new("db1", &log).with_dump(dir.path(), "db1.sql", 64);

    let report = orchestrator(vec![Box::new(source)], vec![Box::new(destination)], notifier(&log)).run();

    assert_eq!(log.failure_errors(), vec![message.to_string()]);
    assert_eq!(log.count("success"), 0);
    let source_report = &report.sources[0];
    assert!(matches!(source_report.outcome, Err(RunError::Send(_))));
    assert_eq!(source_report.stats.size, Some(64));
    assert_eq!(source_report.stats.upload_time, None);
    assert!(!dump.exists());
}

#[test]
fn test_failed_source_does_not_stop_the_run() {
    let dir = TempDir::new().unwrap();
    let log = EventLog::new();
    let sources: Vec<Box<dyn BackupSource>> = vec![
        Box::new(RecordingSource::new("broken", &log).failing("mysqldump: Got error 28")),
        Box::new(RecordingSource::new("healthy", &log).with_dump(dir.path(), "healthy.sql", 5)),
    ];

    let report = orchestrator(sources, Vec::new(), notifier(&log)).run();

    assert_eq!(
        log.kinds(),
        vec!["start", "dump", "failure", "start", "dump", "success"]
    );
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.sources[0].source.id, "broken");
    assert_eq!(report.sources[1].source.id, "healthy");
}

#[test]
fn test_triggers_gate_notifications() {
    let dir = TempDir::new().unwrap();
    let log = EventLog::new();
    let quiet = RecordingNotification::new("failures-only", &log).with_triggers(NotifyTriggers {
        on_start: false,
        on_success: false,
        on_failure: true,
    });
    let sources: Vec<Box<dyn BackupSource>> = vec![
        Box::new(RecordingSource::new("ok", &log).with_dump(dir.path(), "ok.sql", 5)),
        Box::new(RecordingSource::new("bad", &log).failing("boom")),
    ];

    orchestrator(sources, Vec::new(), vec![Box::new(quiet)]).run();

    assert_eq!(log.kinds(), vec!["dump", "dump", "failure"]);
}

#[test]
fn test_fixture_hostname_is_reported() {
    let log = EventLog::new();
    let source = RecordingSource::new("db1", &log).failing("x");
    let run = orchestrator(vec![Box::new(source)], Vec::new(), notifier(&log));
    assert_eq!(run.hostname(), TEST_HOST);
}
