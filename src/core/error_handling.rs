//! Error reporting for top-level failures
//!
//! Errors that a user can fix (bad configuration, misuse of the lifecycle)
//! are shown verbatim. Everything else gets a short context line, with the
//! full error available at debug level.

/// Errors that know whether their message is meant for the user
///
/// When `is_user_actionable()` returns `true`, `user_message()` must return
/// `Some(message)`; otherwise it returns `None`.
pub trait ContextualError: std::error::Error {
    /// True for errors with a clear fix, such as an invalid config value
    fn is_user_actionable(&self) -> bool;

    fn user_message(&self) -> Option<&str>;
}

/// Log a fatal error with detail appropriate to its kind
///
/// # Examples
/// ```rust,no_run
/// use threaded_queue::core::error_handling::log_error_with_context;
/// use threaded_queue::queue::api::QueueError;
///
/// let err = QueueError::Config {
///     message: "join-timeout-ms must be a number".to_string(),
/// };
/// log_error_with_context(&err, "Loading configuration");
/// // Logs: "FATAL: join-timeout-ms must be a number"
///
/// let err = QueueError::SpawnFailed {
///     message: "Resource temporarily unavailable".to_string(),
/// };
/// log_error_with_context(&err, "Starting the queue worker");
/// // Logs: "FATAL: Starting the queue worker"
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    log::error!("FATAL: {}", fatal_line(error, operation_context));
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}

fn fatal_line<'a, E: ContextualError>(error: &'a E, operation_context: &'a str) -> &'a str {
    if error.is_user_actionable() {
        error.user_message().unwrap_or(operation_context)
    } else {
        operation_context
    }
}
