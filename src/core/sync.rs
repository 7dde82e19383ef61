//! Synchronization utilities for robust lock handling
//!
//! Helpers for dealing with lock poisoning consistently across the crate.
//! Locks whose protected data stays consistent even when a holder panics are
//! recovered; everything else is mapped into a domain error.

use std::sync::LockResult;

/// Handle poisoned lock cases with consistent error handling
///
/// Converts a poison error into an application-specific error using the
/// provided constructor.
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use threaded_queue::core::sync::handle_mutex_poison;
/// use threaded_queue::queue::api::QueueError;
///
/// let mutex = Mutex::new(42);
/// let guard = handle_mutex_poison(
///     mutex.lock(),
///     |msg| QueueError::Synchronisation { message: msg }
/// ).unwrap();
/// assert_eq!(*guard, 42);
/// ```
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (mutex poisoned). This indicates a panic occurred while holding a lock. PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Take the guard out of a poisoned lock result
///
/// Only for locks whose data cannot be left half-updated by a panicking
/// holder. The recovery is logged so a poisoned lock never goes unnoticed.
pub fn recover_poison<G>(result: LockResult<G>, lock_name: &str) -> G {
    result.unwrap_or_else(|poison_err| {
        log::warn!("Recovering poisoned lock: {}", lock_name);
        poison_err.into_inner()
    })
}
