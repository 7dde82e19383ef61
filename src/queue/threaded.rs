//! ThreadedQueue - lifecycle control over the dispatch worker
//!
//! The queue handle owns at most one worker thread. Producers may enqueue at
//! any time, before `start`, while draining, or after `stop`; only delivery
//! depends on a worker being alive.

use crate::core::sync::handle_mutex_poison;
use crate::queue::config::QueueConfig;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::handlers::{DeliveryResult, HandlerFault};
use crate::queue::worker::{ExitSignal, Shared, Worker, WorkerState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle, ThreadId};

struct WorkerHandle {
    thread: JoinHandle<()>,
    cancel: Arc<AtomicBool>,
    exit: Arc<ExitSignal>,
    generation: u64,
}

/// A cancelled worker that may still be inside a delivery handler
#[derive(Clone)]
struct Retiring {
    exit: Arc<ExitSignal>,
    generation: u64,
    thread_id: ThreadId,
}

/// At most one of these threads can deliver at any time: a new worker is
/// only started once the retiring one has exited.
#[derive(Default)]
struct WorkerSlot {
    active: Option<WorkerHandle>,
    retiring: Option<Retiring>,
}

/// Priority hand-off queue drained by a single background thread
///
/// Items are delivered lowest priority value first, and in enqueue order
/// within a priority. Delivery handlers run on the worker thread, one item at
/// a time, with no queue lock held.
///
/// # Example
///
/// ```rust,no_run
/// use threaded_queue::queue::api::ThreadedQueue;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let queue = ThreadedQueue::new();
/// queue.on_item_delivered(|message: &String| {
///     println!("{}", message);
///     Ok(())
/// });
/// queue.on_unhandled_fault(|fault| eprintln!("delivery failed: {}", fault));
///
/// queue.start()?;
/// queue.enqueue("routine".to_string());
/// queue.enqueue_with_priority("urgent".to_string(), 0);
/// queue.stop()?;
/// # Ok(())
/// # }
/// ```
pub struct ThreadedQueue<T: Send + 'static> {
    shared: Arc<Shared<T>>,
    config: QueueConfig,
    worker: Mutex<WorkerSlot>,
    running: AtomicBool,
    disposed: AtomicBool,
}

impl<T: Send + 'static> ThreadedQueue<T> {
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    pub fn with_config(config: QueueConfig) -> Self {
        Self {
            shared: Arc::new(Shared::new()),
            config,
            worker: Mutex::new(WorkerSlot::default()),
            running: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Enqueue at the configured default priority
    pub fn enqueue(&self, item: T) {
        self.enqueue_with_priority(item, self.config.default_priority);
    }

    /// Enqueue an item; lower priority values are delivered first
    ///
    /// Never waits on the worker; the only lock taken is the one around the
    /// bucket store insert.
    pub fn enqueue_with_priority(&self, item: T, priority: i32) {
        self.shared.gate.insert(item, priority);
        log::trace!("Enqueued item at priority {}", priority);
    }

    /// Register a handler invoked once per drained item, on the worker thread
    ///
    /// Every registered handler receives every item, in registration order.
    /// Returning `Err` or panicking reports a [`HandlerFault`].
    pub fn on_item_delivered<F>(&self, handler: F)
    where
        F: Fn(&T) -> DeliveryResult + Send + Sync + 'static,
    {
        self.shared.handlers.add_delivery(Arc::new(handler));
    }

    /// Register a handler for delivery faults
    ///
    /// With no fault handler registered, faults are logged and the worker's
    /// faulted flag is raised; see [`FaultPolicy`](crate::queue::config::FaultPolicy).
    pub fn on_unhandled_fault<F>(&self, handler: F)
    where
        F: Fn(&HandlerFault) + Send + Sync + 'static,
    {
        self.shared.handlers.add_fault(Arc::new(handler));
    }

    fn lock_worker(&self) -> QueueResult<MutexGuard<'_, WorkerSlot>> {
        handle_mutex_poison(self.worker.lock(), |message| QueueError::Synchronisation {
            message,
        })
    }

    /// Launch the worker thread
    ///
    /// Fails with [`QueueError::InvalidState`] if a worker is already running,
    /// or if a stopped worker has not yet returned from its current handler.
    pub fn start(&self) -> QueueResult<()> {
        let mut slot = self.lock_worker()?;
        if slot.active.is_some() {
            return Err(QueueError::InvalidState {
                message: "Threaded queue has already been started".to_string(),
            });
        }
        if let Some(generation) = slot
            .retiring
            .as_ref()
            .filter(|retiring| !retiring.exit.has_exited())
            .map(|retiring| retiring.generation)
        {
            return Err(QueueError::InvalidState {
                message: format!(
                    "Queue worker #{} is still finishing its current delivery",
                    generation
                ),
            });
        }
        slot.retiring = None;
        self.config.check()?;

        let cancel = Arc::new(AtomicBool::new(false));
        let exit = Arc::new(ExitSignal::default());
        let generation = self.shared.status.begin();
        let runner = Worker::new(
            Arc::clone(&self.shared),
            Arc::clone(&cancel),
            Arc::clone(&exit),
            generation,
            self.config.fault_policy,
        );

        let thread = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || runner.run())
            .map_err(|e| {
                self.shared.status.end(generation);
                QueueError::SpawnFailed {
                    message: e.to_string(),
                }
            })?;

        slot.active = Some(WorkerHandle {
            thread,
            cancel,
            exit,
            generation,
        });
        self.running.store(true, Ordering::Release);
        log::debug!(
            "Threaded queue started worker #{} ({} item(s) pending, {} delivery / {} fault handler(s))",
            generation,
            self.shared.gate.len(),
            self.shared.handlers.delivery_handler_count(),
            self.shared.handlers.fault_handler_count()
        );
        Ok(())
    }

    /// Cancel the worker and wait for it to exit
    ///
    /// A no-op when no worker is running. Once this returns `Ok`, no delivery
    /// handler will be invoked again until the next `start`. Items still
    /// queued stay queued. If the worker does not exit within the configured
    /// join timeout it stays cancelled, [`QueueError::StopTimeout`] is
    /// returned, and `start` is refused until it has exited.
    ///
    /// Called from a delivery handler, the worker is cancelled without
    /// waiting and exits once that handler returns.
    pub fn stop(&self) -> QueueResult<()> {
        let (retiring, thread) = {
            let mut slot = self.lock_worker()?;
            match slot.active.take() {
                Some(handle) => {
                    handle.cancel.store(true, Ordering::Release);
                    self.shared.gate.wake_all();
                    self.running.store(false, Ordering::Release);

                    let retiring = Retiring {
                        thread_id: handle.thread.thread().id(),
                        exit: handle.exit,
                        generation: handle.generation,
                    };
                    slot.retiring = Some(retiring.clone());
                    (retiring, Some(handle.thread))
                }
                // A previous stop timed out or is still waiting
                None => match &slot.retiring {
                    Some(retiring) if !retiring.exit.has_exited() => (retiring.clone(), None),
                    _ => return Ok(()),
                },
            }
        };

        if retiring.thread_id == thread::current().id() {
            // Waiting on ourselves would deadlock; the loop exits once the
            // current delivery returns.
            log::warn!(
                "stop() called from queue worker #{}; it will exit after the current delivery",
                retiring.generation
            );
            return Ok(());
        }

        let timeout = self.config.join_timeout();
        if !retiring.exit.wait(timeout) {
            let timeout_ms = timeout.map_or(0, |t| t.as_millis() as u64);
            log::warn!(
                "Queue worker #{} did not exit within {}ms; it stays cancelled",
                retiring.generation,
                timeout_ms
            );
            self.shared.status.end(retiring.generation);
            return Err(QueueError::StopTimeout { timeout_ms });
        }

        {
            let mut slot = self.lock_worker()?;
            if slot
                .retiring
                .as_ref()
                .is_some_and(|r| r.generation == retiring.generation)
            {
                slot.retiring = None;
            }
        }
        if let Some(thread) = thread {
            if thread.join().is_err() {
                log::error!("Queue worker #{} panicked during shutdown", retiring.generation);
            }
        }
        log::debug!(
            "Threaded queue stopped worker #{} ({} item(s) left queued)",
            retiring.generation,
            self.shared.gate.len()
        );
        Ok(())
    }

    /// Stop the queue; calls after the first are no-ops
    pub fn dispose(&self) -> QueueResult<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.stop()
    }

    /// True between a successful `start` and the next `stop`
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub fn state(&self) -> WorkerState {
        self.shared.status.state()
    }

    /// True once any delivery has faulted; never cleared
    pub fn has_faulted(&self) -> bool {
        self.shared.status.has_faulted()
    }

    pub fn fault_count(&self) -> u64 {
        self.shared.status.fault_count()
    }

    /// Items taken off the queue and handed to the delivery handlers
    pub fn delivered_count(&self) -> u64 {
        self.shared.status.delivered_count()
    }

    /// Items currently waiting for delivery
    pub fn len(&self) -> usize {
        self.shared.gate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.gate.is_empty()
    }

    /// Discard every queued item, returning how many were dropped
    pub fn clear(&self) -> usize {
        let discarded = self.shared.gate.clear();
        if discarded > 0 {
            log::debug!("Discarded {} queued item(s)", discarded);
        }
        discarded
    }
}

impl<T: Send + 'static> Default for ThreadedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Drop for ThreadedQueue<T> {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            log::error!("Failed to stop threaded queue on drop: {}", e);
        }
    }
}
