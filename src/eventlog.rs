//! Live diagnostic event log
//!
//! An append-only, bounded ring of diagnostic entries: raw inbound and
//! outbound traffic, status transitions, malformed records, and
//! dropped-sample reports. Oldest entries are evicted first once the
//! configured capacity is reached; there is no persistence guarantee.
//!
//! The log is the lowest-risk subscriber: the reader thread appends
//! best-effort (an append that would contend with a concurrent reader is
//! dropped and counted), while the UI thread copies entries out under the
//! lock.

use crate::types::LinkStatus;
use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Default maximum number of retained entries
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// What a log entry records
#[derive(Debug, Clone)]
pub enum LogEntryKind {
    /// Raw inbound record text
    Rx(String),
    /// Raw outbound payload text
    Tx(String),
    /// Link status transition
    Status(LinkStatus),
    /// Record that failed to parse, with the original text preserved
    Malformed { raw: String, reason: String },
    /// Running total of samples discarded by the recorder queue
    DroppedSamples(u64),
    /// The recording sink failed and the recording stopped
    RecordingFailed(String),
}

impl std::fmt::Display for LogEntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogEntryKind::Rx(text) => write!(f, "RX {}", text),
            LogEntryKind::Tx(text) => write!(f, "TX {}", text),
            LogEntryKind::Status(status) => write!(f, "-- {}", status),
            LogEntryKind::Malformed { raw, reason } => {
                write!(f, "!! malformed '{}': {}", raw, reason)
            }
            LogEntryKind::DroppedSamples(total) => {
                write!(f, "!! {} samples dropped by recorder queue", total)
            }
            LogEntryKind::RecordingFailed(cause) => {
                write!(f, "!! recording failed: {}", cause)
            }
        }
    }
}

/// One timestamped diagnostic entry
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Wall-clock time the entry was appended
    pub at: DateTime<Local>,
    pub kind: LogEntryKind,
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.at.format("%H:%M:%S%.3f"), self.kind)
    }
}

/// Bounded in-memory diagnostic log
#[derive(Debug)]
pub struct EventLog {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl EventLog {
    /// Create a log retaining at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Append an entry, best-effort
    ///
    /// If the log is momentarily contended the entry is discarded and
    /// counted instead; appends never block the caller.
    pub fn append(&self, kind: LogEntryKind) {
        match self.entries.try_lock() {
            Ok(mut entries) => {
                if entries.len() == self.capacity {
                    entries.pop_front();
                }
                entries.push_back(LogEntry {
                    at: Local::now(),
                    kind,
                });
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// A stable copy of the retained entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum retained entry count
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries discarded because the log was contended
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Discard all retained entries
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
