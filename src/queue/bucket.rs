//! Priority bucket store
//!
//! Ordered collection of FIFO buckets keyed by priority. The lowest priority
//! value is always drained first, and items sharing a priority come out in the
//! order they went in. The store does no locking of its own; the gate wraps it
//! in a mutex.

use std::collections::{BTreeMap, VecDeque};

/// An item together with the priority it was enqueued with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<T> {
    pub item: T,
    pub priority: i32,
}

/// FIFO buckets keyed by ascending priority
///
/// Empty buckets are removed as soon as their last item is taken, so the map
/// only ever holds priorities that have pending work.
#[derive(Debug)]
pub struct BucketStore<T> {
    buckets: BTreeMap<i32, VecDeque<T>>,
    len: usize,
}

impl<T> BucketStore<T> {
    pub fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
            len: 0,
        }
    }

    /// Append an item to the tail of its priority bucket, creating the bucket
    /// on first use
    pub fn insert(&mut self, item: T, priority: i32) {
        self.buckets.entry(priority).or_default().push_back(item);
        self.len += 1;
    }

    /// Take the head of the lowest-priority bucket
    pub fn try_remove_lowest(&mut self) -> Option<Entry<T>> {
        let mut bucket = self.buckets.first_entry()?;
        let priority = *bucket.key();
        let item = bucket.get_mut().pop_front();

        if bucket.get().is_empty() {
            bucket.remove();
        }

        item.map(|item| {
            self.len -= 1;
            Entry { item, priority }
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total number of items across all buckets
    pub fn len(&self) -> usize {
        self.len
    }

    /// Number of distinct priorities with pending items
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Priority of the next item `try_remove_lowest` would return
    pub fn peek_lowest_priority(&self) -> Option<i32> {
        self.buckets.keys().next().copied()
    }

    /// Discard everything, returning how many items were dropped
    pub fn clear(&mut self) -> usize {
        let discarded = self.len;
        self.buckets.clear();
        self.len = 0;
        discarded
    }
}

impl<T> Default for BucketStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
