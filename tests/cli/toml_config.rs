//! CLI TOML configuration tests
//!
//! Config file discovery, value mapping, and command-line precedence.

use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;
use threaded_queue::app::cli::args::*;
use threaded_queue::queue::api::{FaultPolicy, QueueError};
use toml::Table;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn args_with_config(file: &NamedTempFile, extra: &[&str]) -> Args {
    let path = file.path().to_str().unwrap();
    let mut argv = vec!["threaded-queue", "--config-file", path];
    argv.extend_from_slice(extra);
    Args::try_parse_from(argv).unwrap()
}

#[test]
fn test_config_file_fills_unset_options() {
    let file = config_file(
        r#"
log-level = "warn"
log-format = "ext"
producers = 6
items = 50
priorities = 2
fail-every = 9

[queue]
default-priority = 1
join-timeout-ms = 250
fault-policy = "halt"
thread-name = "demo-worker"
"#,
    );
    let mut args = args_with_config(&file, &[]);

    let queue_config = args.load_config().unwrap();

    assert_eq!(args.log_level.as_deref(), Some("warn"));
    assert_eq!(args.log_format.as_deref(), Some("ext"));
    let settings = args.demo_settings();
    assert_eq!(settings.producers, 6);
    assert_eq!(settings.items, 50);
    assert_eq!(settings.priorities, 2);
    assert_eq!(settings.fail_every, Some(9));

    assert_eq!(queue_config.default_priority, 1);
    assert_eq!(queue_config.join_timeout(), Some(Duration::from_millis(250)));
    assert_eq!(queue_config.fault_policy, FaultPolicy::Halt);
    assert_eq!(queue_config.thread_name, "demo-worker");
}

#[test]
fn test_command_line_overrides_config_file() {
    let file = config_file("log-level = \"warn\"\nproducers = 6\nno-color = false\n");
    let mut args = args_with_config(&file, &["--log-level", "trace", "-p", "3", "--no-color"]);

    args.load_config().unwrap();

    assert_eq!(args.log_level.as_deref(), Some("trace"));
    assert_eq!(args.demo_settings().producers, 3);
    assert!(args.no_color);
}

#[test]
fn test_config_without_queue_table_uses_queue_defaults() {
    let file = config_file("items = 1\n");
    let mut args = args_with_config(&file, &[]);

    let queue_config = args.load_config().unwrap();

    assert_eq!(queue_config, Default::default());
    assert_eq!(args.demo_settings().items, 1);
}

#[test]
fn test_missing_explicit_config_file_is_an_error() {
    let mut args = Args {
        config_file: Some(PathBuf::from("/nonexistent/threaded-queue.toml")),
        ..Args::default()
    };

    match args.load_config() {
        Err(QueueError::Config { message }) => assert!(message.contains("does not exist")),
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
fn test_malformed_config_file_is_an_error() {
    let file = config_file("producers = [\n");
    let mut args = args_with_config(&file, &[]);

    assert!(matches!(args.load_config(), Err(QueueError::Config { .. })));
}

#[test]
fn test_unknown_queue_key_is_an_error() {
    let file = config_file("[queue]\nworkers = 4\n");
    let mut args = args_with_config(&file, &[]);

    assert!(matches!(args.load_config(), Err(QueueError::Config { .. })));
}

#[test]
fn test_wrong_value_types_rejected() {
    let mut args = Args::default();

    let mut config = Table::new();
    config.insert("producers".to_string(), toml::Value::Integer(-1));
    assert!(Args::apply_toml_values(&mut args, &config).is_err());

    let mut config = Table::new();
    config.insert("log-level".to_string(), toml::Value::Boolean(true));
    assert!(Args::apply_toml_values(&mut args, &config).is_err());
}

#[test]
fn test_color_key_maps_to_no_color() {
    let mut args = Args::default();
    let mut config = Table::new();
    config.insert("color".to_string(), toml::Value::Boolean(false));

    Args::apply_toml_values(&mut args, &config).unwrap();
    assert!(args.no_color);
}

#[test]
fn test_log_file_from_config() {
    let mut args = Args::default();
    let mut config = Table::new();
    config.insert(
        "log-file".to_string(),
        toml::Value::String("none".to_string()),
    );

    Args::apply_toml_values(&mut args, &config).unwrap();
    assert_eq!(args.log_file, Some(PathBuf::from("none")));
    assert_eq!(args.effective_log_file(), None);
}
