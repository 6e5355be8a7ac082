//! Core data types for the acquisition pipeline
//!
//! This module contains the fundamental data structures flowing through the
//! pipeline, from framed transport bytes to parsed samples and link status.
//!
//! # Main Types
//!
//! - [`RawRecord`] - One newline-delimited frame with sequence number and
//!   arrival timestamp; consumed exactly once by the parser
//! - [`Sample`] - A parsed data point: one numeric value per channel, plus
//!   the validated record text for verbatim persistence
//! - [`ParseOutcome`] - Either a [`Sample`] or a malformed record with the
//!   original bytes preserved
//! - [`LinkStatus`] - The process-wide connection fact, held in a
//!   [`StatusCell`] readable from any thread
//! - [`PipelineStats`] - Shared atomic counters, lock-free to read
//!
//! # Ownership
//!
//! [`Sample`] is an immutable value object. The dispatcher hands each
//! subscriber its own clone; no subscriber can mutate a sample another
//! subscriber still holds.

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One newline-delimited frame read from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Monotonic sequence number within the session
    pub seq: u64,
    /// Arrival time relative to session start
    pub timestamp: Duration,
    /// Frame payload, without the line terminator
    pub bytes: Vec<u8>,
}

impl RawRecord {
    /// Create a new record
    pub fn new(seq: u64, timestamp: Duration, bytes: Vec<u8>) -> Self {
        Self {
            seq,
            timestamp,
            bytes,
        }
    }

    /// The payload as text, lossy for display purposes
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// A parsed data point derived from one valid record
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Sequence number inherited from the source record
    pub seq: u64,
    /// Arrival time inherited from the source record
    pub timestamp: Duration,
    /// One value per comma-separated channel, in field order
    pub values: Vec<f64>,
    /// The validated record text, retained so the recorder can persist the
    /// device's own numeric formatting verbatim
    pub text: String,
}

impl Sample {
    /// Number of data channels in this sample
    pub fn channel_count(&self) -> usize {
        self.values.len()
    }
}

/// Result of parsing one raw record
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// The record parsed cleanly
    Sample(Sample),
    /// The record could not be parsed; forwarded to the event log only
    Malformed {
        /// Original record bytes, preserved verbatim
        raw: Vec<u8>,
        /// Human-readable failure reason
        reason: String,
    },
}

/// Connection status of the serial link
///
/// Emitted once per transition. The supervisor holds the current value in a
/// [`StatusCell`]; it is a process-wide fact, not a queued event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// No link is open
    Disconnected {
        /// Why the link closed ("Disconnected." for a clean close)
        reason: String,
    },
    /// A link is being opened
    Connecting {
        /// Port being opened
        port: String,
    },
    /// The link is open and the reader loop is running
    Connected {
        /// Port name
        port: String,
        /// Baud rate
        baud: u32,
    },
    /// The link failed; the session is over
    Error {
        /// Transport failure cause
        cause: String,
    },
}

impl Default for LinkStatus {
    fn default() -> Self {
        LinkStatus::Disconnected {
            reason: "Not connected".to_string(),
        }
    }
}

impl LinkStatus {
    /// Whether the link is currently usable
    pub fn is_connected(&self) -> bool {
        matches!(self, LinkStatus::Connected { .. })
    }
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkStatus::Disconnected { reason } => write!(f, "{}", reason),
            LinkStatus::Connecting { port } => write!(f, "Connecting to {}...", port),
            LinkStatus::Connected { port, baud } => {
                write!(f, "Connected to {} at {} bps", port, baud)
            }
            LinkStatus::Error { cause } => write!(f, "Error: {}", cause),
        }
    }
}

/// Holder of the current [`LinkStatus`]
///
/// Written by the supervisor and the reader thread, read by the UI thread.
/// The lock is held only for a clone, never across I/O.
#[derive(Debug, Default)]
pub struct StatusCell {
    inner: Mutex<LinkStatus>,
}

impl StatusCell {
    /// Create a cell holding the default (disconnected) status
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current status
    pub fn set(&self, status: LinkStatus) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *inner = status;
    }

    /// Read the current status
    pub fn get(&self) -> LinkStatus {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Shared counters for the pipeline, updated with relaxed atomics
///
/// The reader thread increments these; any thread may read them without
/// blocking via [`PipelineStats::snapshot`].
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Raw bytes read from the transport
    pub bytes_read: AtomicU64,
    /// Complete frames observed by the framer
    pub records_framed: AtomicU64,
    /// Records that parsed into samples
    pub samples_parsed: AtomicU64,
    /// Records rejected by the parser
    pub parse_failures: AtomicU64,
    /// Samples discarded by the recorder queue under backpressure
    pub samples_dropped: AtomicU64,
}

impl PipelineStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero all counters (start of a new session)
    pub fn reset(&self) {
        self.bytes_read.store(0, Ordering::Relaxed);
        self.records_framed.store(0, Ordering::Relaxed);
        self.samples_parsed.store(0, Ordering::Relaxed);
        self.parse_failures.store(0, Ordering::Relaxed);
        self.samples_dropped.store(0, Ordering::Relaxed);
    }

    /// A plain copy of the counters for display
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            records_framed: self.records_framed.load(Ordering::Relaxed),
            samples_parsed: self.samples_parsed.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub bytes_read: u64,
    pub records_framed: u64,
    pub samples_parsed: u64,
    pub parse_failures: u64,
    pub samples_dropped: u64,
}

impl StatsSnapshot {
    /// Fraction of framed records that parsed, as a percentage
    pub fn parse_success_rate(&self) -> f64 {
        let total = self.samples_parsed + self.parse_failures;
        if total == 0 {
            100.0
        } else {
            (self.samples_parsed as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let status = LinkStatus::Connected {
            port: "/dev/ttyUSB0".to_string(),
            baud: 115_200,
        };
        assert_eq!(status.to_string(), "Connected to /dev/ttyUSB0 at 115200 bps");
        assert!(status.is_connected());
        assert!(!LinkStatus::default().is_connected());
    }

    #[test]
    fn test_status_cell_set_get() {
        let cell = StatusCell::new();
        assert_eq!(cell.get(), LinkStatus::default());

        cell.set(LinkStatus::Error {
            cause: "device removed".to_string(),
        });
        assert!(matches!(cell.get(), LinkStatus::Error { .. }));
    }

    #[test]
    fn test_raw_record_text_lossy() {
        let record = RawRecord::new(0, Duration::ZERO, vec![0x31, 0x2C, 0xFF]);
        assert_eq!(record.text(), "1,\u{FFFD}");
    }

    #[test]
    fn test_stats_snapshot_and_reset() {
        let stats = PipelineStats::new();
        stats.samples_parsed.fetch_add(3, Ordering::Relaxed);
        stats.parse_failures.fetch_add(1, Ordering::Relaxed);

        let snap = stats.snapshot();
        assert_eq!(snap.samples_parsed, 3);
        assert_eq!(snap.parse_failures, 1);
        assert_eq!(snap.parse_success_rate(), 75.0);

        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
        assert_eq!(stats.snapshot().parse_success_rate(), 100.0);
    }
}
