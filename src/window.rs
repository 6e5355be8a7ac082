//! Sliding window buffer feeding the visualization
//!
//! A fixed-capacity, arrival-ordered ring of the most recent samples. The
//! reader thread inserts; the UI thread takes snapshots. Eviction is strict
//! FIFO: when the buffer is at capacity, inserting one entry evicts exactly
//! the oldest. A snapshot never observes a half-applied insert.
//!
//! The buffer stores raw values only; axis scaling is the renderer's
//! concern, computed from the snapshot.

use crate::types::Sample;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Default number of entries retained for plotting
pub const DEFAULT_WINDOW_CAPACITY: usize = 1000;

/// A sample plus its position in the window
#[derive(Debug, Clone, PartialEq)]
pub struct WindowEntry {
    /// Arrival sequence number, strictly increasing across entries
    pub seq: u64,
    pub sample: Sample,
}

#[derive(Debug)]
struct Inner {
    entries: VecDeque<WindowEntry>,
    capacity: usize,
}

/// Bounded most-recent-N view of the sample stream
#[derive(Debug)]
pub struct SlidingWindowBuffer {
    inner: Mutex<Inner>,
}

impl SlidingWindowBuffer {
    /// Create a buffer retaining at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                entries: VecDeque::with_capacity(capacity),
                capacity,
            }),
        }
    }

    /// Insert a sample, evicting the oldest entry if at capacity
    pub fn insert(&self, sample: Sample) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        while inner.entries.len() >= inner.capacity {
            inner.entries.pop_front();
        }
        let entry = WindowEntry {
            seq: sample.seq,
            sample,
        };
        inner.entries.push_back(entry);
    }

    /// A stable, ordered copy of the current window, oldest first
    pub fn snapshot(&self) -> Vec<WindowEntry> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .iter()
            .cloned()
            .collect()
    }

    /// Current number of entries
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }

    /// Whether the window holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured entry capacity
    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).capacity
    }

    /// Change the capacity, keeping the newest entries on shrink
    pub fn set_capacity(&self, capacity: usize) {
        let capacity = capacity.max(1);
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.capacity = capacity;
        while inner.entries.len() > capacity {
            inner.entries.pop_front();
        }
    }

    /// Discard all entries (start of a new session)
    pub fn clear(&self) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .clear();
    }
}
