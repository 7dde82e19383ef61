//! TOML configuration file loading
//!
//! Top-level keys mirror the long command-line options (`log-level`,
//! `producers`, ...). The `[queue]` table configures the queue itself.

use super::args::Args;
use crate::queue::api::{QueueConfig, QueueError, QueueResult};
use std::path::{Path, PathBuf};

impl Args {
    /// Resolve and load the config file, filling options the command line left unset
    ///
    /// An explicitly named file must exist. Without one, the default location
    /// is used when present, and defaults apply otherwise.
    pub fn load_config(&mut self) -> QueueResult<QueueConfig> {
        let Some(path) = self.config_path()? else {
            log::debug!("No configuration file found; using defaults");
            return Ok(QueueConfig::default());
        };

        let contents = std::fs::read_to_string(&path).map_err(|e| QueueError::Config {
            message: format!("cannot read configuration file {}: {e}", path.display()),
        })?;
        let table = contents
            .parse::<toml::Table>()
            .map_err(|e| QueueError::Config {
                message: format!("cannot parse configuration file {}: {e}", path.display()),
            })?;

        Self::apply_toml_values(self, &table)?;
        QueueConfig::from_toml_str(&contents)
    }

    fn config_path(&self) -> QueueResult<Option<PathBuf>> {
        match &self.config_file {
            Some(path) if path.exists() => Ok(Some(path.clone())),
            Some(path) => Err(QueueError::Config {
                message: format!(
                    "The specified configuration file does not exist: {}",
                    path.display()
                ),
            }),
            None => Ok(QueueConfig::default_path().filter(|path| Path::exists(path))),
        }
    }

    /// Apply top-level TOML values to options not given on the command line
    pub fn apply_toml_values(args: &mut Self, config: &toml::Table) -> QueueResult<()> {
        if args.log_level.is_none() {
            args.log_level = string_field(config, "log-level")?;
        }
        if args.log_format.is_none() {
            args.log_format = string_field(config, "log-format")?;
        }
        if args.log_file.is_none() {
            args.log_file = string_field(config, "log-file")?.map(PathBuf::from);
        }
        if !args.no_color {
            if let Some(no_color) = bool_field(config, "no-color")? {
                args.no_color = no_color;
            } else if let Some(color) = bool_field(config, "color")? {
                args.no_color = !color;
            }
        }
        if args.producers.is_none() {
            args.producers = count_field(config, "producers")?;
        }
        if args.items.is_none() {
            args.items = count_field(config, "items")?;
        }
        if args.priorities.is_none() {
            args.priorities = count_field(config, "priorities")?
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX));
        }
        if args.fail_every.is_none() {
            args.fail_every = count_field(config, "fail-every")?;
        }
        Ok(())
    }
}

fn type_error(key: &str, expected: &str) -> QueueError {
    QueueError::Config {
        message: format!("'{key}' must be {expected}"),
    }
}

fn string_field(config: &toml::Table, key: &str) -> QueueResult<Option<String>> {
    match config.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| type_error(key, "a string")),
    }
}

fn bool_field(config: &toml::Table, key: &str) -> QueueResult<Option<bool>> {
    match config.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_bool()
            .map(Some)
            .ok_or_else(|| type_error(key, "true or false")),
    }
}

fn count_field(config: &toml::Table, key: &str) -> QueueResult<Option<usize>> {
    match config.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_integer()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| type_error(key, "a non-negative integer")),
    }
}
