//! Public API for the queue system
//!
//! External modules should import from here rather than directly from the
//! internal modules. See the module documentation for usage and architecture.

// Queue handle and worker status
pub use crate::queue::threaded::ThreadedQueue;
pub use crate::queue::worker::WorkerState;

// Configuration
pub use crate::queue::config::{FaultPolicy, QueueConfig, DEFAULT_PRIORITY};

// Handler signatures and fault reports
pub use crate::queue::handlers::{DeliveryError, DeliveryResult, HandlerFault};

// Error handling
pub use crate::queue::error::{QueueError, QueueResult};

// Underlying ordered store, usable on its own under external locking
pub use crate::queue::bucket::{BucketStore, Entry};
