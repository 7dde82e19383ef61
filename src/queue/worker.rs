//! Dispatch worker loop
//!
//! The single consumer thread. It parks on the gate until work is pending or
//! it is cancelled, pops one entry at a time and delivers it to every
//! registered handler with no lock held. Handler errors and panics are
//! converted into [`HandlerFault`]s and reported; they never unwind the
//! worker.

use crate::core::sync::recover_poison;
use crate::queue::bucket::Entry;
use crate::queue::config::FaultPolicy;
use crate::queue::gate::{Gate, Next};
use crate::queue::handlers::{HandlerFault, HandlerRegistry};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Observable state of the dispatch worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Waiting for the pending signal
    Idle,
    /// Popping and delivering items
    Draining,
    /// No worker is running, or the worker halted
    Stopped,
}

impl WorkerState {
    fn as_u8(self) -> u8 {
        match self {
            WorkerState::Idle => 0,
            WorkerState::Draining => 1,
            WorkerState::Stopped => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Draining,
            _ => WorkerState::Stopped,
        }
    }
}

/// Counters and flags the worker publishes for status queries
#[derive(Debug)]
pub(crate) struct WorkerStatus {
    state: AtomicU8,
    generation: AtomicU64,
    faulted: AtomicBool,
    fault_count: AtomicU64,
    delivered: AtomicU64,
}

impl WorkerStatus {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(WorkerState::Stopped.as_u8()),
            generation: AtomicU64::new(0),
            faulted: AtomicBool::new(false),
            fault_count: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
        }
    }

    /// Claim a new generation for a worker about to be spawned
    pub fn begin(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.state
            .store(WorkerState::Idle.as_u8(), Ordering::Release);
        generation
    }

    /// Publish a state change, ignored if a newer worker has since started
    fn set_state(&self, generation: u64, state: WorkerState) {
        if self.generation.load(Ordering::Acquire) == generation {
            self.state.store(state.as_u8(), Ordering::Release);
        }
    }

    /// Mark the current generation stopped, whatever its thread is doing
    pub fn end(&self, generation: u64) {
        self.set_state(generation, WorkerState::Stopped);
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn has_faulted(&self) -> bool {
        self.faulted.load(Ordering::Acquire)
    }

    pub fn fault_count(&self) -> u64 {
        self.fault_count.load(Ordering::Acquire)
    }

    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Acquire)
    }

    fn record_fault(&self) {
        self.faulted.store(true, Ordering::Release);
        self.fault_count.fetch_add(1, Ordering::AcqRel);
    }

    fn record_delivery(&self) {
        self.delivered.fetch_add(1, Ordering::AcqRel);
    }
}

/// State shared between the queue handle and its worker thread
pub(crate) struct Shared<T> {
    pub gate: Gate<T>,
    pub handlers: HandlerRegistry<T>,
    pub status: WorkerStatus,
}

impl<T> Shared<T> {
    pub fn new() -> Self {
        Self {
            gate: Gate::new(),
            handlers: HandlerRegistry::new(),
            status: WorkerStatus::new(),
        }
    }
}

/// Raised once when a worker's `run` returns, for bounded joins
#[derive(Debug, Default)]
pub(crate) struct ExitSignal {
    exited: Mutex<bool>,
    changed: Condvar,
}

impl ExitSignal {
    fn notify_exited(&self) {
        *recover_poison(self.exited.lock(), "worker exit signal") = true;
        self.changed.notify_all();
    }

    pub fn has_exited(&self) -> bool {
        *recover_poison(self.exited.lock(), "worker exit signal")
    }

    /// Wait for the worker to exit; false if `timeout` elapsed first
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let exited = recover_poison(self.exited.lock(), "worker exit signal");
        match timeout {
            Some(timeout) => {
                let (exited, _) = recover_poison(
                    self.changed
                        .wait_timeout_while(exited, timeout, |exited| !*exited),
                    "worker exit signal",
                );
                *exited
            }
            None => {
                let exited = recover_poison(
                    self.changed.wait_while(exited, |exited| !*exited),
                    "worker exit signal",
                );
                *exited
            }
        }
    }
}

/// Signals exit on drop so a bounded join observes every way out of `run`
struct ExitGuard(Arc<ExitSignal>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.notify_exited();
    }
}

pub(crate) struct Worker<T> {
    shared: Arc<Shared<T>>,
    cancel: Arc<AtomicBool>,
    exit: Arc<ExitSignal>,
    generation: u64,
    fault_policy: FaultPolicy,
}

impl<T> Worker<T> {
    pub fn new(
        shared: Arc<Shared<T>>,
        cancel: Arc<AtomicBool>,
        exit: Arc<ExitSignal>,
        generation: u64,
        fault_policy: FaultPolicy,
    ) -> Self {
        Self {
            shared,
            cancel,
            exit,
            generation,
            fault_policy,
        }
    }

    pub fn run(self) {
        let _exit = ExitGuard(Arc::clone(&self.exit));
        log::debug!("Queue worker #{} started", self.generation);

        loop {
            match self.shared.gate.next(&self.cancel) {
                Next::Cancelled => {
                    log::debug!("Queue worker #{} cancelled", self.generation);
                    break;
                }
                Next::Item { entry, drained } => {
                    self.shared
                        .status
                        .set_state(self.generation, WorkerState::Draining);

                    if !self.deliver(entry) {
                        log::error!(
                            "Queue worker #{} halted by unhandled fault; {} item(s) left undelivered",
                            self.generation,
                            self.shared.gate.len()
                        );
                        break;
                    }

                    if drained {
                        self.shared
                            .status
                            .set_state(self.generation, WorkerState::Idle);
                    }
                }
            }
        }

        self.shared.status.end(self.generation);
        log::debug!("Queue worker #{} exited", self.generation);
    }

    /// Hand one entry to every delivery handler
    ///
    /// Every handler sees the entry even when an earlier one faulted.
    /// Returns false when the worker must halt afterwards.
    fn deliver(&self, entry: Entry<T>) -> bool {
        let handlers = self.shared.handlers.delivery_snapshot();
        if handlers.is_empty() {
            log::trace!(
                "No delivery handlers registered; priority {} item dropped",
                entry.priority
            );
        }

        let mut halt = false;
        for (index, handler) in handlers.iter().enumerate() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(&entry.item)));
            let fault = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(error)) => HandlerFault::from_error(entry.priority, index, &error),
                Err(payload) => HandlerFault::from_panic(entry.priority, index, payload.as_ref()),
            };

            let handled = self.report(&fault);
            if !handled && self.fault_policy == FaultPolicy::Halt {
                halt = true;
            }
        }

        self.shared.status.record_delivery();
        !halt
    }

    /// Broadcast a fault to the fault handlers; false if nobody was listening
    fn report(&self, fault: &HandlerFault) -> bool {
        self.shared.status.record_fault();

        let handlers = self.shared.handlers.fault_snapshot();
        if handlers.is_empty() {
            log::error!("Unhandled delivery fault: {}", fault);
            return false;
        }

        log::debug!("Reporting delivery fault: {}", fault);
        for handler in &handlers {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(fault))) {
                log::error!(
                    "Fault handler panicked while reporting '{}': {}",
                    fault,
                    crate::queue::handlers::panic_message(payload.as_ref())
                );
            }
        }
        true
    }
}
