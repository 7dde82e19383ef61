//! Threaded Priority Queue Component
//!
//! A hand-off queue that lets any number of producer threads submit items
//! tagged with an integer priority, while a single dedicated worker thread
//! drains them and dispatches each one to the registered handlers.
//!
//! # Overview
//!
//! - **Priority Ordering**: lower priority values are delivered first
//! - **FIFO Within Priority**: equal priorities keep their enqueue order
//! - **Non-blocking Producers**: enqueue only locks around the store insert
//! - **Single Consumer**: one worker thread serializes every delivery
//! - **Cooperative Shutdown**: stop cancels the worker and joins it, bounded
//!   by a configurable timeout
//! - **Fault Reporting**: handler errors and panics are reported and the
//!   worker carries on with the next item
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Producer A  │     │  Producer B  │     │  Producer C  │
//! └──────┬───────┘     └──────┬───────┘     └──────┬───────┘
//!        │ enqueue            │ enqueue            │ enqueue
//!        ▼                    ▼                    ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │        Gate (mutex + pending signal + condvar)          │
//! │  ┌─────────────────────────────────────────────────┐   │
//! │  │  BucketStore   p0: [a, b]   p1: [c]   p5: [d]   │   │
//! │  └─────────────────────────────────────────────────┘   │
//! └──────────────────────────┬──────────────────────────────┘
//!                            │ next (lowest priority, FIFO)
//!                    ┌───────┴────────┐
//!                    │ Worker thread  │──► delivery handlers
//!                    └────────────────┘──► fault handlers
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use threaded_queue::queue::{ThreadedQueue, QueueConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = ThreadedQueue::with_config(QueueConfig::default().with_thread_name("notifier"));
//! queue.on_item_delivered(|event: &&'static str| {
//!     println!("Received: {}", event);
//!     Ok(())
//! });
//!
//! queue.enqueue_with_priority("low", 9);
//! queue.enqueue_with_priority("high", 1);
//! queue.start()?; // delivers "high" then "low"
//! queue.stop()?;
//! # Ok(())
//! # }
//! ```

pub mod api;
mod bucket;
mod config;
mod error;
mod gate;
mod handlers;
mod threaded;
mod worker;

pub use bucket::{BucketStore, Entry};
pub use config::{FaultPolicy, QueueConfig, DEFAULT_PRIORITY};
pub use error::{QueueError, QueueResult};
pub use handlers::{DeliveryError, DeliveryResult, HandlerFault};
pub use threaded::ThreadedQueue;
pub use worker::WorkerState;

#[cfg(test)]
mod tests;
