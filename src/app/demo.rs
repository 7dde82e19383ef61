//! Demo workload: several producer threads feeding one queue

use crate::app::cli::args::DemoSettings;
use crate::queue::api::{QueueConfig, QueueResult, ThreadedQueue, WorkerState};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoItem {
    pub producer: usize,
    pub sequence: usize,
    pub priority: i32,
}

impl fmt::Display for DemoItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "producer {} item {} (priority {})",
            self.producer, self.sequence, self.priority
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoSummary {
    pub enqueued: usize,
    pub delivered: u64,
    pub faults: u64,
    pub faulted: bool,
    pub undelivered: usize,
    pub interrupted: bool,
}

/// Run producers to completion, drain the queue and shut the worker down
///
/// `shutdown` cuts both production and draining short; whatever is still
/// queued at that point is reported as undelivered.
pub fn run_demo(
    settings: DemoSettings,
    config: QueueConfig,
    shutdown: Arc<AtomicBool>,
    print_deliveries: bool,
) -> QueueResult<DemoSummary> {
    let queue = Arc::new(ThreadedQueue::with_config(config));
    let attempts = Arc::new(AtomicUsize::new(0));

    {
        let attempts = Arc::clone(&attempts);
        let fail_every = settings.fail_every;
        queue.on_item_delivered(move |item: &DemoItem| {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            if fail_every.is_some_and(|n| attempt % n == 0) {
                return Err(format!("simulated failure on delivery {attempt}").into());
            }
            if print_deliveries {
                println!("delivered {}", item);
            }
            Ok(())
        });
    }
    queue.on_unhandled_fault(|fault| log::warn!("{}", fault));

    queue.start()?;
    log::info!(
        "Queue started; {} producers x {} items over {} priorities",
        settings.producers,
        settings.items,
        settings.priorities
    );

    let enqueued = Arc::new(AtomicUsize::new(0));
    let producers: Vec<_> = (0..settings.producers)
        .map(|producer| {
            let queue = Arc::clone(&queue);
            let shutdown = Arc::clone(&shutdown);
            let enqueued = Arc::clone(&enqueued);
            thread::spawn(move || {
                for sequence in 0..settings.items {
                    if shutdown.load(Ordering::Acquire) {
                        log::debug!("Producer {} interrupted at item {}", producer, sequence);
                        break;
                    }
                    let priority = ((producer + sequence) % settings.priorities as usize) as i32;
                    queue.enqueue_with_priority(
                        DemoItem {
                            producer,
                            sequence,
                            priority,
                        },
                        priority,
                    );
                    enqueued.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    for producer in producers {
        if producer.join().is_err() {
            log::error!("Producer thread panicked");
        }
    }

    while !shutdown.load(Ordering::Acquire) && !is_drained(&queue) {
        thread::sleep(DRAIN_POLL_INTERVAL);
    }

    queue.dispose()?;

    let summary = DemoSummary {
        enqueued: enqueued.load(Ordering::Relaxed),
        delivered: queue.delivered_count(),
        faults: queue.fault_count(),
        faulted: queue.has_faulted(),
        undelivered: queue.len(),
        interrupted: shutdown.load(Ordering::Acquire),
    };
    log::info!(
        "Queue stopped; delivered {} of {} items",
        summary.delivered,
        summary.enqueued
    );
    Ok(summary)
}

fn is_drained<T: Send + 'static>(queue: &ThreadedQueue<T>) -> bool {
    // A halted worker will not drain any further
    match queue.state() {
        WorkerState::Stopped => true,
        WorkerState::Idle => queue.is_empty(),
        WorkerState::Draining => false,
    }
}
