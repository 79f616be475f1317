//! Tests for building adapters from configuration

use backup_orchestrator::managers::registry::KNOWN_MODULES;
use std::sync::Arc;
use test_utils::{
    run_time, AdapterConfig, AdapterContext, AdapterRegistry, BackupSource, ConfigBuilder,
    ConfigError, MockExecutor, RunOrchestrator,
};

fn context() -> AdapterContext {
    AdapterContext::new(Arc::new(MockExecutor::new())).with_run_time(run_time())
}

#[test]
fn test_all_known_modules_register_their_type() {
    let registry = AdapterRegistry::with_modules(KNOWN_MODULES);

    for tag in ["mysql", "command"] {
        assert!(registry.has_source(tag), "{}", tag);
    }
    for tag in ["s3", "local"] {
        assert!(registry.has_destination(tag), "{}", tag);
    }
    for tag in ["prometheus", "discord"] {
        assert!(registry.has_notification(tag), "{}", tag);
    }
}

#[test]
fn test_orchestrator_from_config() {
    let builder = ConfigBuilder::new()
        .modules(&["sources.mysql", "sources.command", "destinations.s3", "destinations.local"])
        .mysql_source("shop", "shop")
        .command_source("files", "tar -c /srv")
        .s3_destination("offsite", "backups")
        .local_destination("nas", 2);
    let config = builder.build();
    let registry = AdapterRegistry::from_config(&config);

    assert!(RunOrchestrator::from_config(&config, &registry, &context()).is_ok());
}

#[test]
fn test_disabled_module_entries_are_skipped() {
    // command sources are not enabled by default
    let builder = ConfigBuilder::new()
        .command_source("files", "tar -c /srv")
        .mysql_source("shop", "shop");
    let config = builder.build();
    let registry = AdapterRegistry::from_config(&config);

    let sources = registry.build_sources(&config.sources, &context()).unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].info().id, "shop");
    assert_eq!(sources[0].info().source_type, "mysql");
}

#[test]
fn test_no_instantiated_sources_is_fatal() {
    let builder = ConfigBuilder::local().mysql_source("shop", "shop");
    let config = builder.build();
    let registry = AdapterRegistry::from_config(&config);

    let err = RunOrchestrator::from_config(&config, &registry, &context()).err().unwrap();
    assert!(matches!(err, ConfigError::NoSources));
}

#[test]
fn test_zero_retention_is_rejected() {
    let builder = ConfigBuilder::local()
        .command_source("files", "tar -c /srv")
        .local_destination("nas", 0);
    let config = builder.build();
    let registry = AdapterRegistry::from_config(&config);

    let err = RunOrchestrator::from_config(&config, &registry, &context()).err().unwrap();
    assert!(matches!(err, ConfigError::ValidationError(_)));
}

#[test]
fn test_invalid_notification_settings_name_the_entry() {
    let builder = ConfigBuilder::new()
        .mysql_source("shop", "shop")
        .entry("notifications", AdapterConfig::new("prometheus", serde_json::json!({"id": "gw"})));
    let config = builder.build();
    let registry = AdapterRegistry::from_config(&config);

    let err = RunOrchestrator::from_config(&config, &registry, &context()).err().unwrap();
    match err {
        ConfigError::InvalidAdapter { adapter_type, id, .. } => {
            assert_eq!(adapter_type, "prometheus");
            assert_eq!(id, "gw");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
