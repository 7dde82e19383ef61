//! Queue Error Types

use crate::core::error_handling::ContextualError;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Invalid queue state: {message}")]
    InvalidState { message: String },

    #[error("Failed to spawn worker thread: {message}")]
    SpawnFailed { message: String },

    #[error("Worker thread did not terminate within {timeout_ms}ms")]
    StopTimeout { timeout_ms: u64 },

    #[error("Synchronisation failure: {message}")]
    Synchronisation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

impl ContextualError for QueueError {
    fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            QueueError::InvalidState { .. } | QueueError::Config { .. }
        )
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            QueueError::InvalidState { message } | QueueError::Config { message } => {
                Some(message)
            }
            _ => None,
        }
    }
}
