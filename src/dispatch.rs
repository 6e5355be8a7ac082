//! Fan-out of parsed samples to independently-paced subscribers
//!
//! The dispatcher runs on the reader thread and is the single point where
//! parsed samples and status transitions reach the consumers. Each
//! subscriber class has its own backpressure policy, and none of them can
//! slow the producer down:
//!
//! - **Coalescing** (visualization): delivery is an in-place update of the
//!   shared [`SlidingWindowBuffer`]; only the most recent window state is
//!   observable, intermediate states are never queued.
//! - **Queued-bounded** (recorder): a bounded channel; on overflow the
//!   oldest *queued* sample is discarded, counted, and reported to the
//!   event log. The producer side is never slowed.
//! - **Best-effort** (event log): appends may be dropped under contention,
//!   with a dropped-entry counter.
//!
//! The dispatcher also owns the session's established channel count: set by
//! the first successfully parsed record, fixed until the next session. A
//! later record with a different field count is malformed, not a schema
//! change.

use crate::eventlog::{EventLog, LogEntryKind};
use crate::parser::parse_record;
use crate::types::{LinkStatus, ParseOutcome, PipelineStats, RawRecord, Sample, StatusCell};
use crate::window::SlidingWindowBuffer;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

/// Default capacity of the recorder's bounded sample queue
pub const DEFAULT_SAMPLE_QUEUE_CAPACITY: usize = 4096;

/// Consuming side of the queued-bounded sample subscription
#[derive(Debug, Clone)]
pub struct SampleSubscription {
    pub(crate) receiver: Receiver<Sample>,
}

impl SampleSubscription {
    /// Take one queued sample without blocking
    pub fn try_recv(&self) -> Option<Sample> {
        self.receiver.try_recv().ok()
    }

    /// Drain everything currently queued
    pub fn drain(&self) -> Vec<Sample> {
        let mut samples = Vec::new();
        while let Ok(sample) = self.receiver.try_recv() {
            samples.push(sample);
        }
        samples
    }

    /// Number of samples currently queued
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether the queue is currently empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

#[derive(Debug)]
struct QueuePair {
    tx: Sender<Sample>,
    /// Receiver clone used to discard the oldest queued sample on overflow
    overflow_rx: Receiver<Sample>,
}

/// Producer-side handle to the recorder's sample queue
///
/// The queue is installed when a recording starts and removed when it
/// stops; while absent, published samples bypass the queued tier entirely.
/// Shared between the supervisor (install/remove) and the dispatcher
/// (publish); the lock is held only for a `try_send`, never across I/O.
#[derive(Debug, Clone, Default)]
pub struct SharedSampleQueue {
    inner: Arc<Mutex<Option<QueuePair>>>,
}

impl SharedSampleQueue {
    /// Create an empty (uninstalled) queue handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fresh bounded queue, returning the consuming side
    pub fn install(&self, capacity: usize) -> SampleSubscription {
        let (tx, rx) = bounded(capacity.max(1));
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *inner = Some(QueuePair {
            tx,
            overflow_rx: rx.clone(),
        });
        SampleSubscription { receiver: rx }
    }

    /// Remove the queue; the consuming side sees a disconnect once drained
    pub fn remove(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *inner = None;
    }

    /// Whether a consumer is currently attached
    pub fn is_installed(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    pub(crate) fn publish(&self, sample: Sample, stats: &PipelineStats, log: &EventLog) {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let Some(queue) = inner.as_ref() else {
            return;
        };
        match queue.tx.try_send(sample) {
            Ok(()) => {}
            Err(TrySendError::Full(sample)) => {
                // Discard the oldest queued sample to make room; the
                // consumer may have raced us and drained one already.
                let evicted = queue.overflow_rx.try_recv().is_ok();
                let requeued = queue.tx.try_send(sample).is_ok();
                if evicted || !requeued {
                    let dropped = stats.samples_dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    log.append(LogEntryKind::DroppedSamples(dropped));
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                // Consumer is gone; treated as unsubscribed
            }
        }
    }
}

/// Single fan-out point for parsed samples and status transitions
pub struct Dispatcher {
    window: Arc<SlidingWindowBuffer>,
    log: Arc<EventLog>,
    status: Arc<StatusCell>,
    samples: SharedSampleQueue,
    stats: Arc<PipelineStats>,
    established_channels: Option<usize>,
}

impl Dispatcher {
    /// Wire a dispatcher to its subscribers
    pub fn new(
        window: Arc<SlidingWindowBuffer>,
        log: Arc<EventLog>,
        status: Arc<StatusCell>,
        samples: SharedSampleQueue,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            window,
            log,
            status,
            samples,
            stats,
            established_channels: None,
        }
    }

    /// The session's established channel count, if any record parsed yet
    pub fn established_channels(&self) -> Option<usize> {
        self.established_channels
    }

    /// Ingest one framed record: parse, then fan out by subscriber tier
    pub fn ingest(&mut self, record: RawRecord) {
        self.stats.records_framed.fetch_add(1, Ordering::Relaxed);
        self.log.append(LogEntryKind::Rx(record.text().into_owned()));

        match parse_record(&record, self.established_channels) {
            ParseOutcome::Sample(sample) => {
                if self.established_channels.is_none() {
                    self.established_channels = Some(sample.channel_count());
                    tracing::debug!(
                        "Established channel count: {}",
                        sample.channel_count()
                    );
                }
                self.window.insert(sample.clone());
                self.samples.publish(sample, &self.stats, &self.log);
                // Counted after fan-out so observers of the counter see the
                // sample in every tier
                self.stats.samples_parsed.fetch_add(1, Ordering::Relaxed);
            }
            ParseOutcome::Malformed { raw, reason } => {
                self.stats.parse_failures.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Malformed record: {}", reason);
                self.log.append(LogEntryKind::Malformed {
                    raw: String::from_utf8_lossy(&raw).into_owned(),
                    reason,
                });
            }
        }
    }

    /// Publish a status transition to the status cell and the event log
    pub fn publish_status(&self, status: LinkStatus) {
        tracing::info!("Link status: {}", status);
        self.status.set(status.clone());
        self.log.append(LogEntryKind::Status(status));
    }

    /// Record an outbound payload in the event log
    pub fn publish_tx(&self, payload: &[u8]) {
        let text = String::from_utf8_lossy(payload);
        self.log.append(LogEntryKind::Tx(
            text.trim_end_matches(&['\r', '\n'][..]).to_string(),
        ));
    }
}
