//! Synchronization gate
//!
//! One mutex guards the bucket store together with the pending signal, and a
//! condition variable wakes the worker when the signal goes high or the worker
//! is cancelled. The pending signal is only ever changed inside the same
//! critical section as the store, so it always equals `!store.is_empty()`.

use crate::core::sync::recover_poison;
use crate::queue::bucket::{BucketStore, Entry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};

#[derive(Debug)]
struct GateState<T> {
    store: BucketStore<T>,
    pending: bool,
}

/// Outcome of a worker's wait on the gate
#[derive(Debug)]
pub enum Next<T> {
    /// An entry was taken; `drained` is true if it was the last one pending
    Item { entry: Entry<T>, drained: bool },
    /// The worker's cancellation flag was raised
    Cancelled,
}

#[derive(Debug)]
pub struct Gate<T> {
    state: Mutex<GateState<T>>,
    work_available: Condvar,
}

impl<T> Gate<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                store: BucketStore::new(),
                pending: false,
            }),
            work_available: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState<T>> {
        // No user code ever runs under this lock, so a poisoned guard still
        // holds a consistent store.
        recover_poison(self.state.lock(), "queue gate")
    }

    /// Insert an item and raise the pending signal
    pub fn insert(&self, item: T, priority: i32) {
        {
            let mut state = self.lock();
            state.store.insert(item, priority);
            state.pending = true;
        }
        // A detached worker that missed its stop deadline may still be parked
        // here alongside the current one.
        self.work_available.notify_all();
    }

    /// Block until an entry is available or `cancel` is raised
    ///
    /// The cancellation flag is checked before every pop, so a worker that
    /// has been cancelled never takes another entry out of the store.
    pub fn next(&self, cancel: &AtomicBool) -> Next<T> {
        let mut state = self.lock();
        loop {
            state = recover_poison(
                self.work_available.wait_while(state, |state| {
                    !state.pending && !cancel.load(Ordering::Acquire)
                }),
                "queue gate",
            );

            if cancel.load(Ordering::Acquire) {
                return Next::Cancelled;
            }

            if let Some(entry) = state.store.try_remove_lowest() {
                state.pending = !state.store.is_empty();
                return Next::Item {
                    entry,
                    drained: !state.pending,
                };
            }

            // Signal raised over an empty store: resynchronise and park again
            state.pending = false;
        }
    }

    /// Wake every waiter so it re-checks its cancellation flag
    ///
    /// Callers raise the flag first; taking the lock before notifying closes
    /// the window between a waiter's predicate check and its park.
    pub fn wake_all(&self) {
        let _state = self.lock();
        self.work_available.notify_all();
    }

    pub fn len(&self) -> usize {
        self.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().store.is_empty()
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.lock().pending
    }

    /// Discard all pending items
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        state.pending = false;
        state.store.clear()
    }
}

impl<T> Default for Gate<T> {
    fn default() -> Self {
        Self::new()
    }
}
