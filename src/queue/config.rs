//! Queue configuration
//!
//! Settings can be built in code or read from the `[queue]` table of a TOML
//! file:
//!
//! ```toml
//! [queue]
//! default-priority = 5
//! join-timeout-ms = 5000   # 0 waits forever
//! fault-policy = "continue" # or "halt"
//! thread-name = "threaded-queue"
//! ```

use crate::queue::error::{QueueError, QueueResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PRIORITY: i32 = 5;
pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_THREAD_NAME: &str = "threaded-queue";

/// What the worker does with a delivery fault nobody subscribed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultPolicy {
    /// Log the fault, flag the worker as faulted and keep draining
    #[default]
    Continue,
    /// Stop delivering altogether; enqueues are still accepted
    Halt,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct QueueConfig {
    pub default_priority: i32,
    pub join_timeout_ms: u64,
    pub fault_policy: FaultPolicy,
    pub thread_name: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_priority: DEFAULT_PRIORITY,
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
            fault_policy: FaultPolicy::default(),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    queue: QueueConfig,
}

impl QueueConfig {
    pub fn with_default_priority(mut self, priority: i32) -> Self {
        self.default_priority = priority;
        self
    }

    /// Bound how long `stop()` waits for the worker; `None` waits forever
    pub fn with_join_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.join_timeout_ms = match timeout {
            Some(timeout) => u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX).max(1),
            None => 0,
        };
        self
    }

    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn join_timeout(&self) -> Option<Duration> {
        match self.join_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Parse the `[queue]` table of a TOML document; a missing table yields defaults
    pub fn from_toml_str(contents: &str) -> QueueResult<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| QueueError::Config {
            message: format!("invalid queue configuration: {e}"),
        })?;
        file.queue.validate()
    }

    pub fn load(path: &Path) -> QueueResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| QueueError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    /// `<config dir>/ThreadedQueue/threaded-queue.toml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ThreadedQueue").join("threaded-queue.toml"))
    }

    fn validate(self) -> QueueResult<Self> {
        self.check()?;
        Ok(self)
    }

    /// Reject settings the worker thread cannot be spawned with
    pub(crate) fn check(&self) -> QueueResult<()> {
        if self.thread_name.trim().is_empty() {
            return Err(QueueError::Config {
                message: "thread-name must not be empty".to_string(),
            });
        }
        if self.thread_name.contains('\0') {
            return Err(QueueError::Config {
                message: "thread-name must not contain NUL bytes".to_string(),
            });
        }
        Ok(())
    }
}
