//! Command-line argument parsing tests

use clap::Parser;
use std::path::PathBuf;
use threaded_queue::app::cli::args::*;

#[test]
fn test_no_arguments_uses_demo_defaults() {
    let args = Args::try_parse_from(["threaded-queue"]).unwrap();

    assert_eq!(args, Args::default());
    assert_eq!(
        args.demo_settings(),
        DemoSettings {
            producers: DEFAULT_PRODUCERS,
            items: DEFAULT_ITEMS,
            priorities: DEFAULT_PRIORITIES,
            fail_every: None,
        }
    );
}

#[test]
fn test_demo_flags() {
    let args = Args::try_parse_from([
        "threaded-queue",
        "--producers",
        "4",
        "-n",
        "100",
        "--priorities=8",
        "--fail-every",
        "7",
    ])
    .unwrap();

    let settings = args.demo_settings();
    assert_eq!(settings.producers, 4);
    assert_eq!(settings.items, 100);
    assert_eq!(settings.priorities, 8);
    assert_eq!(settings.fail_every, Some(7));
}

#[test]
fn test_fail_every_zero_disables_failures() {
    let args = Args::try_parse_from(["threaded-queue", "--fail-every", "0"]).unwrap();
    assert_eq!(args.demo_settings().fail_every, None);
}

#[test]
fn test_zero_priorities_rejected() {
    assert!(Args::try_parse_from(["threaded-queue", "--priorities", "0"]).is_err());
}

#[test]
fn test_zero_producers_clamped_to_one() {
    let args = Args::try_parse_from(["threaded-queue", "-p", "0"]).unwrap();
    assert_eq!(args.demo_settings().producers, 1);
}

#[test]
fn test_logging_flags() {
    let args = Args::try_parse_from([
        "threaded-queue",
        "--log-level",
        "debug",
        "--log-format",
        "json",
        "--log-file",
        "/tmp/queue.log",
        "--no-color",
    ])
    .unwrap();

    assert_eq!(args.log_level.as_deref(), Some("debug"));
    assert_eq!(args.log_format.as_deref(), Some("json"));
    assert_eq!(args.log_file, Some(PathBuf::from("/tmp/queue.log")));
    assert_eq!(args.effective_log_file(), Some("/tmp/queue.log"));
    assert!(args.no_color);
    assert!(!args.use_color());
}

#[test]
fn test_invalid_log_values_rejected() {
    assert!(Args::try_parse_from(["threaded-queue", "--log-level", "loud"]).is_err());
    assert!(Args::try_parse_from(["threaded-queue", "--log-format", "xml"]).is_err());
}

#[test]
fn test_log_file_none_disables_file_logging() {
    for value in ["none", "NONE", "-"] {
        let args = Args::try_parse_from(["threaded-queue", "--log-file", value]).unwrap();
        assert_eq!(args.effective_log_file(), None, "value {value}");
    }
}

#[test]
fn test_unknown_flag_rejected() {
    assert!(Args::try_parse_from(["threaded-queue", "--workers", "2"]).is_err());
}
