//! Asynchronous CSV recorder
//!
//! Samples are persisted on a dedicated writer thread so slow storage can
//! never delay the reader or the UI. The sink is opened when recording
//! starts; the header row (`channel1,...,channelN`) is written exactly once,
//! on the first sample, with N taken from that sample's channel count. Every
//! subsequent sample is appended as one row in arrival order, using the
//! device's own numeric text verbatim.
//!
//! # Shutdown and failure
//!
//! [`Recorder::stop`] drains the queued samples, flushes and closes the
//! sink; the same path runs when the pipeline shuts down or the link dies
//! (the subscription disconnecting is the cancellation signal), so no
//! accepted row is ever left unflushed. A sink failure mid-session emits a
//! [`LogEntryKind::RecordingFailed`] event and stops the recording; the
//! acquisition side keeps running and nothing is retried automatically.

use crate::dispatch::SampleSubscription;
use crate::error::{Result, SerialVisError};
use crate::eventlog::{EventLog, LogEntryKind};
use crate::types::Sample;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Metadata for one recording session
#[derive(Debug, Clone)]
pub struct RecordingSession {
    /// Sink path
    pub path: PathBuf,
    /// When the recording started
    pub started_at: DateTime<Utc>,
    /// Header channel count, set when the first sample is written
    pub channels: Option<usize>,
    /// Data rows written so far (header excluded)
    pub rows_written: u64,
    /// Whether the sink failed before the recording was stopped
    pub failed: bool,
}

enum RecorderControl {
    Stop,
}

/// Handle to an active recording
pub struct Recorder {
    control_tx: Sender<RecorderControl>,
    handle: Option<JoinHandle<RecordingSession>>,
}

impl Recorder {
    /// Open the sink at `path` and start persisting `subscription`'s samples
    pub fn start(
        path: impl AsRef<Path>,
        subscription: SampleSubscription,
        log: Arc<EventLog>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| {
            SerialVisError::Sink(format!("failed to create {}: {}", path.display(), e))
        })?;
        let writer = BufWriter::new(file);
        let session = RecordingSession {
            path: path.clone(),
            started_at: Utc::now(),
            channels: None,
            rows_written: 0,
            failed: false,
        };

        let (control_tx, control_rx) = bounded(1);
        let handle = std::thread::Builder::new()
            .name("serialvis-recorder".to_string())
            .spawn(move || run_writer(writer, session, subscription, control_rx, log))
            .map_err(|e| {
                SerialVisError::Channel(format!("failed to spawn recorder thread: {}", e))
            })?;

        tracing::info!("Recording started: {}", path.display());
        Ok(Self {
            control_tx,
            handle: Some(handle),
        })
    }

    /// Whether the writer thread is still running
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Stop recording: drain the queue, flush and close the sink
    pub fn stop(mut self) -> Result<RecordingSession> {
        let _ = self.control_tx.send(RecorderControl::Stop);
        let handle = self
            .handle
            .take()
            .ok_or_else(|| SerialVisError::Channel("recorder already stopped".to_string()))?;
        let session = handle
            .join()
            .map_err(|_| SerialVisError::Channel("recorder thread panicked".to_string()))?;
        tracing::info!(
            "Recording stopped: {} rows written to {}",
            session.rows_written,
            session.path.display()
        );
        Ok(session)
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.control_tx.send(RecorderControl::Stop);
            let _ = handle.join();
        }
    }
}

fn run_writer(
    mut writer: BufWriter<File>,
    mut session: RecordingSession,
    subscription: SampleSubscription,
    control_rx: Receiver<RecorderControl>,
    log: Arc<EventLog>,
) -> RecordingSession {
    let samples = &subscription.receiver;

    loop {
        select! {
            recv(samples) -> msg => match msg {
                Ok(sample) => {
                    if let Err(e) = write_sample(&mut writer, &mut session, &sample) {
                        report_failure(&mut session, &log, &e);
                        return session;
                    }
                }
                // Producer gone: pipeline shutdown or fatal link error
                Err(_) => break,
            },
            recv(control_rx) -> _ => break,
        }
    }

    // Drain whatever was queued before the stop signal
    while let Ok(sample) = samples.try_recv() {
        if let Err(e) = write_sample(&mut writer, &mut session, &sample) {
            report_failure(&mut session, &log, &e);
            return session;
        }
    }

    if let Err(e) = writer.flush() {
        let e = SerialVisError::Sink(format!("flush failed: {}", e));
        report_failure(&mut session, &log, &e);
    }
    session
}

fn write_sample(
    writer: &mut BufWriter<File>,
    session: &mut RecordingSession,
    sample: &Sample,
) -> Result<()> {
    if session.channels.is_none() {
        let count = sample.channel_count();
        let header = (1..=count)
            .map(|i| format!("channel{}", i))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(writer, "{}", header)
            .map_err(|e| SerialVisError::Sink(format!("header write failed: {}", e)))?;
        session.channels = Some(count);
    }

    writeln!(writer, "{}", sample.text)
        .map_err(|e| SerialVisError::Sink(format!("row write failed: {}", e)))?;
    session.rows_written += 1;
    Ok(())
}

fn report_failure(session: &mut RecordingSession, log: &EventLog, error: &SerialVisError) {
    tracing::error!("Recording to {} failed: {}", session.path.display(), error);
    session.failed = true;
    log.append(LogEntryKind::RecordingFailed(error.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::SharedSampleQueue;
    use std::time::Duration;

    fn sample(seq: u64, text: &str) -> Sample {
        Sample {
            seq,
            timestamp: Duration::from_millis(seq),
            values: text
                .split(',')
                .map(|f| f.trim().parse().expect("numeric test field"))
                .collect(),
            text: text.to_string(),
        }
    }

    /// Publish through the producer-side handle, as the dispatcher does
    fn feed(queue: &SharedSampleQueue, texts: &[&str]) {
        let log = EventLog::new(16);
        let stats = crate::types::PipelineStats::new();
        for (seq, text) in texts.iter().enumerate() {
            queue.publish(sample(seq as u64, text), &stats, &log);
        }
    }

    #[test]
    fn test_round_trip_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.csv");

        let queue = SharedSampleQueue::new();
        let subscription = queue.install(16);
        let log = Arc::new(EventLog::new(16));

        let recorder = Recorder::start(&path, subscription, log).unwrap();
        feed(&queue, &["1.0,2.0", "3.0,4.0", "5.0,6.0"]);

        let session = recorder.stop().unwrap();
        assert_eq!(session.rows_written, 3);
        assert_eq!(session.channels, Some(2));
        assert!(!session.failed);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "channel1,channel2\n1.0,2.0\n3.0,4.0\n5.0,6.0\n");
    }

    #[test]
    fn test_stop_without_samples_writes_no_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        let queue = SharedSampleQueue::new();
        let subscription = queue.install(4);
        let log = Arc::new(EventLog::new(16));

        let recorder = Recorder::start(&path, subscription, log).unwrap();
        let session = recorder.stop().unwrap();

        assert_eq!(session.rows_written, 0);
        assert_eq!(session.channels, None);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_queue_disconnect_flushes_and_closes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.csv");

        let queue = SharedSampleQueue::new();
        let subscription = queue.install(16);
        let log = Arc::new(EventLog::new(16));

        let recorder = Recorder::start(&path, subscription, log).unwrap();
        feed(&queue, &["1.0", "2.0"]);

        // Removing the queue drops the producer; the writer drains and exits
        queue.remove();
        let session = recorder.stop().unwrap();

        assert_eq!(session.rows_written, 2);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "channel1\n1.0\n2.0\n");
    }

    #[test]
    fn test_unwritable_sink_fails_at_start() {
        let dir = tempfile::tempdir().unwrap();
        // A directory path is not a creatable file
        let queue = SharedSampleQueue::new();
        let subscription = queue.install(4);
        let log = Arc::new(EventLog::new(16));

        let result = Recorder::start(dir.path(), subscription, log);
        assert!(matches!(result, Err(SerialVisError::Sink(_))));
    }

    #[test]
    fn test_header_matches_first_sample_channel_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.csv");

        let queue = SharedSampleQueue::new();
        let subscription = queue.install(16);
        let log = Arc::new(EventLog::new(16));

        let recorder = Recorder::start(&path, subscription, log).unwrap();
        feed(&queue, &["1.0,2.0,3.0"]);

        let session = recorder.stop().unwrap();
        assert_eq!(session.channels, Some(3));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("channel1,channel2,channel3\n"));
    }
}
