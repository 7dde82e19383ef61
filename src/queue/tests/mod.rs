//! Test modules for the threaded queue
//!
//! Suites are organised by functional area; shared helpers live here.

mod lifecycle;

use crate::queue::api::ThreadedQueue;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Poll `condition` until it holds or `timeout` elapses
pub(crate) fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Register a handler that records every delivered item in order
pub(crate) fn record_deliveries<T>(queue: &ThreadedQueue<T>) -> Arc<Mutex<Vec<T>>>
where
    T: Clone + Send + Sync + 'static,
{
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delivered);
    queue.on_item_delivered(move |item: &T| {
        sink.lock().unwrap().push(item.clone());
        Ok(())
    });
    delivered
}

/// Wait up to two seconds for `items` to reach `len` entries
pub(crate) fn wait_for_len<T>(items: &Arc<Mutex<Vec<T>>>, len: usize) -> bool {
    wait_until(Duration::from_secs(2), || items.lock().unwrap().len() >= len)
}
