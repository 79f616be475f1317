//! Tests for loading and validating job descriptions

use backup_orchestrator::config::{load_config, parse_config, ConfigFormat, DEFAULT_MODULES};
use rstest::rstest;
use std::fs;
use test_utils::{minimal_config_json, minimal_config_toml, ConfigBuilder, ConfigError};

#[test]
fn test_minimal_json_uses_default_modules() {
    let config = parse_config(minimal_config_json(), ConfigFormat::Json).unwrap();

    assert_eq!(config.effective_modules(), DEFAULT_MODULES);
    assert_eq!(config.sources.len(), 1);
    assert_eq!(config.sources[0].adapter_type, "mysql");
    assert_eq!(config.sources[0].id(), Some("shop"));
}

#[test]
fn test_toml_and_json_agree() {
    let json = parse_config(minimal_config_json(), ConfigFormat::Json).unwrap();
    let toml = parse_config(minimal_config_toml(), ConfigFormat::Toml).unwrap();

    assert_eq!(json.sources, toml.sources);
    assert_eq!(json.destinations, toml.destinations);
    assert_eq!(json.notifications, toml.notifications);
}

#[test]
fn test_load_config_picks_format_from_extension() {
    let builder = ConfigBuilder::new();
    let path = builder.path().join("job.toml");
    fs::write(&path, minimal_config_toml()).unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.destinations[0].adapter_type, "s3");
}

#[test]
fn test_builder_round_trips_through_json_file() {
    let builder = ConfigBuilder::local()
        .command_source("files", "tar -c /etc")
        .local_destination("nas", 3);

    let config = load_config(builder.write_json()).unwrap();

    assert_eq!(
        config.effective_modules(),
        vec!["sources.command".to_string(), "destinations.local".to_string()]
    );
    assert_eq!(config.sources[0].id(), Some("files"));
    assert_eq!(config.destinations[0].settings["retention_copies"], 3);
}

#[test]
fn test_missing_file_is_read_error() {
    let err = load_config("/nonexistent/backup.json").unwrap_err();
    assert!(matches!(err, ConfigError::ReadError(_)));
}

#[test]
fn test_zero_sources_is_fatal() {
    let err = parse_config(r#"{"sources": []}"#, ConfigFormat::Json).unwrap_err();
    assert!(matches!(err, ConfigError::NoSources));
    assert_eq!(err.to_string(), "No sources listed in configuration file.");
}

#[rstest]
#[case::missing_type(r#"{"sources": [{"id": "a"}]}"#)]
#[case::sources_not_a_list(r#"{"sources": {"type": "mysql"}}"#)]
#[case::not_json("sources = 1")]
fn test_malformed_documents_are_parse_errors(#[case] contents: &str) {
    let err = parse_config(contents, ConfigFormat::Json).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[rstest]
#[case::empty_type(r#"{"sources": [{"type": " ", "id": "a"}]}"#)]
#[case::missing_id(r#"{"sources": [{"type": "mysql"}]}"#)]
#[case::duplicate_id(r#"{"sources": [{"type": "mysql", "id": "a"}, {"type": "command", "id": "a"}]}"#)]
#[case::empty_module(r#"{"modules": [""], "sources": [{"type": "mysql", "id": "a"}]}"#)]
fn test_invalid_documents_are_validation_errors(#[case] contents: &str) {
    let err = parse_config(contents, ConfigFormat::Json).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)), "{:?}", err);
}
