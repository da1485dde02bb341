//! Installs the process-wide logger with a missing configuration file and the
//! fallback policy. Runs in its own test binary since a logger can be installed
//! only once per process.

use std::fs;

use klog::rotation::default_log_path;
use klog::{Config, ConfigErrorPolicy, InitOptions, init_service_with};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn test_fallback_logs_config_error() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let missing = dir.path().join("config.json");

    // the default log file lives in the temp dir and may hold earlier runs
    let log_path = default_log_path();
    let offset = fs::metadata(&log_path).map(|m| m.len() as usize).unwrap_or(0);

    let service = init_service_with(&InitOptions {
        config_path: Some(missing.clone()),
        on_config_error: ConfigErrorPolicy::FallbackToDefaults,
    })?;
    assert_eq!(service.config(), &Config::default());
    assert_eq!(service.log_path(), log_path.as_path());
    service.shutdown();

    let contents = fs::read(&log_path)?;
    let records: Vec<Value> = String::from_utf8_lossy(&contents[offset.min(contents.len())..])
        .lines()
        .map(serde_json::from_str::<Value>)
        .collect::<Result<_, _>>()?;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["level"], "warn");
    let warning = records[0]["msg"].as_str().unwrap_or_default();
    assert!(warning.contains("unable to read config file"), "got {warning}");
    assert!(warning.contains(&missing.display().to_string()));
    assert!(warning.ends_with("using default logger settings."));
    assert_eq!(records[1]["level"], "info");
    assert_eq!(records[1]["msg"], "Logger initialized.");

    Ok(())
}

#[test]
fn test_abort_policy_reports_missing_config() {
    let dir = TempDir::new().expect("temp dir");

    let err = match init_service_with(&InitOptions {
        config_path: Some(dir.path().join("config.json")),
        on_config_error: ConfigErrorPolicy::Abort,
    }) {
        Err(err) => err,
        Ok(_) => panic!("missing config file was accepted"),
    };

    assert!(matches!(err, klog::InitError::Config(klog::ConfigError::Io { .. })), "got {err:?}");
}
