//! Command-line arguments for the demo binary
//!
//! Every option is optional so that values from the TOML config file can fill
//! the gaps; command-line values always take precedence.

use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_PRODUCERS: usize = 2;
pub const DEFAULT_ITEMS: usize = 10;
pub const DEFAULT_PRIORITIES: u32 = 3;

#[derive(Parser, Debug, Clone, Default, PartialEq)]
#[command(name = "threaded-queue")]
#[command(about = "Priority hand-off queue with a single delivery thread")]
#[command(version)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Number of producer threads
    #[arg(short = 'p', long = "producers", value_name = "COUNT")]
    pub producers: Option<usize>,

    /// Items enqueued by each producer
    #[arg(short = 'n', long = "items", value_name = "COUNT")]
    pub items: Option<usize>,

    /// Number of distinct priority levels (0 is delivered first)
    #[arg(short = 'P', long = "priorities", value_name = "COUNT", value_parser = clap::value_parser!(u32).range(1..))]
    pub priorities: Option<u32>,

    /// Fail every Nth delivery to exercise fault reporting (0 disables)
    #[arg(short = 'F', long = "fail-every", value_name = "N")]
    pub fail_every: Option<usize>,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Disable coloured output
    #[arg(long = "no-color")]
    pub no_color: bool,
}

/// Demo parameters after defaults have been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoSettings {
    pub producers: usize,
    pub items: usize,
    pub priorities: u32,
    pub fail_every: Option<usize>,
}

impl Args {
    pub fn demo_settings(&self) -> DemoSettings {
        DemoSettings {
            producers: self.producers.unwrap_or(DEFAULT_PRODUCERS).max(1),
            items: self.items.unwrap_or(DEFAULT_ITEMS),
            priorities: self.priorities.unwrap_or(DEFAULT_PRIORITIES).max(1),
            fail_every: self.fail_every.filter(|n| *n > 0),
        }
    }

    /// Log file to open, with the 'none' and '-' spellings meaning no file
    pub fn effective_log_file(&self) -> Option<&str> {
        self.log_file
            .as_deref()
            .and_then(|path| path.to_str())
            .filter(|path| !path.eq_ignore_ascii_case("none") && *path != "-")
    }

    pub fn use_color(&self) -> bool {
        use std::io::IsTerminal;
        !self.no_color && std::io::stdout().is_terminal()
    }
}
