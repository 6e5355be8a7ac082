//! Pipeline lifecycle and error-policy coordination
//!
//! The supervisor is the entry point the UI layer talks to. It owns the
//! session state machine, spawns and cancels the reader thread, starts and
//! stops recordings, and holds the process-wide link status.
//!
//! # State machine
//!
//! ```text
//! Idle -> Connecting -> Connected -> Disconnecting -> Idle
//!                           |
//!                           v (fatal transport error)
//!                         Error -> Idle
//! ```
//!
//! `connect` is only valid from `Idle`; `disconnect` only from `Connected`.
//! A fatal transport error ends the reader loop on its own; the supervisor
//! notices on the next call, joins the thread, flushes and closes an active
//! recording, and returns to `Idle`. Reconnection always re-enters via
//! `Connecting` with a fresh dispatcher and a cleared window; a stale
//! session is never resumed.

use crate::config::PipelineConfig;
use crate::dispatch::{Dispatcher, SharedSampleQueue};
use crate::error::{Result, SerialVisError};
use crate::eventlog::{EventLog, LogEntry, LogEntryKind};
use crate::link::{LinkCommand, LinkWorker, SerialLink, SystemLink};
use crate::recorder::{Recorder, RecordingSession};
use crate::types::{LinkStatus, PipelineStats, StatsSnapshot, StatusCell};
use crate::window::{SlidingWindowBuffer, WindowEntry};
use crossbeam_channel::{bounded, Sender};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Capacity of the reader command queue; callers only ever enqueue
const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Lifecycle states of the acquisition session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session; `connect` is valid
    #[default]
    Idle,
    /// A link is being opened
    Connecting,
    /// The reader loop is running
    Connected,
    /// A clean shutdown is in progress
    Disconnecting,
    /// A fatal transport error is being cleaned up
    Error,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Connected => write!(f, "connected"),
            SessionState::Disconnecting => write!(f, "disconnecting"),
            SessionState::Error => write!(f, "error"),
        }
    }
}

struct ActiveSession {
    command_tx: Sender<LinkCommand>,
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Lifecycle coordinator and public interface of the pipeline
pub struct Supervisor {
    config: PipelineConfig,
    state: SessionState,
    status: Arc<StatusCell>,
    stats: Arc<PipelineStats>,
    window: Arc<SlidingWindowBuffer>,
    log: Arc<EventLog>,
    samples: SharedSampleQueue,
    session: Option<ActiveSession>,
    recorder: Option<Recorder>,
}

impl Supervisor {
    /// Create an idle supervisor from a pipeline configuration
    pub fn new(config: PipelineConfig) -> Self {
        let window = Arc::new(SlidingWindowBuffer::new(config.window.capacity));
        let log = Arc::new(EventLog::new(config.log.capacity));
        Self {
            config,
            state: SessionState::Idle,
            status: Arc::new(StatusCell::new()),
            stats: Arc::new(PipelineStats::new()),
            window,
            log,
            samples: SharedSampleQueue::new(),
            session: None,
            recorder: None,
        }
    }

    /// Open a system serial port and start the reader loop
    ///
    /// Only valid from `Idle`.
    pub fn connect(&mut self, port: &str, baud: u32) -> Result<()> {
        self.refresh_state();
        self.ensure_idle("connect")?;

        self.state = SessionState::Connecting;
        self.publish_status(LinkStatus::Connecting {
            port: port.to_string(),
        });

        match SystemLink::open(port, baud) {
            Ok(link) => self.spawn_session(Box::new(link)),
            Err(e) => {
                self.state = SessionState::Idle;
                self.publish_status(LinkStatus::Error {
                    cause: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Start the reader loop over an already-open link
    ///
    /// Entry point for headless use and tests; the production path is
    /// [`Supervisor::connect`]. Only valid from `Idle`.
    pub fn connect_link(&mut self, link: Box<dyn SerialLink>) -> Result<()> {
        self.refresh_state();
        self.ensure_idle("connect")?;

        self.state = SessionState::Connecting;
        self.publish_status(LinkStatus::Connecting {
            port: link.name().to_string(),
        });
        self.spawn_session(link)
    }

    /// Stop the reader loop and close the link
    ///
    /// Flushes and closes an active recording first. Only valid from
    /// `Connected`.
    pub fn disconnect(&mut self) -> Result<()> {
        self.refresh_state();
        if self.state != SessionState::Connected {
            return Err(SerialVisError::InvalidState(format!(
                "disconnect is only valid while connected (currently {})",
                self.state
            )));
        }

        self.state = SessionState::Disconnecting;
        if let Some(session) = self.session.take() {
            session.running.store(false, Ordering::SeqCst);
            let _ = session.command_tx.try_send(LinkCommand::Shutdown);
            let _ = session.handle.join();
        }
        self.finish_recording();
        self.samples.remove();
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Queue a payload for transmission on the reader thread
    ///
    /// Never blocks longer than the enqueue itself.
    pub fn send_command(&mut self, text: &str) -> Result<()> {
        self.refresh_state();
        let session = self.session.as_ref().ok_or_else(|| {
            SerialVisError::InvalidState("cannot send: not connected".to_string())
        })?;
        session
            .command_tx
            .try_send(LinkCommand::Write(text.as_bytes().to_vec()))
            .map_err(|_| {
                SerialVisError::Overflow("outbound command queue is full".to_string())
            })
    }

    /// Start recording accepted samples to a CSV file at `path`
    pub fn start_recording(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.refresh_state();
        if self.recorder.as_ref().map(Recorder::is_active).unwrap_or(false) {
            return Err(SerialVisError::InvalidState(
                "a recording is already active".to_string(),
            ));
        }
        // A recorder whose sink already failed still needs joining
        self.finish_recording();

        let subscription = self
            .samples
            .install(self.config.recorder.queue_capacity);
        match Recorder::start(path, subscription, self.log.clone()) {
            Ok(recorder) => {
                self.recorder = Some(recorder);
                Ok(())
            }
            Err(e) => {
                self.samples.remove();
                Err(e)
            }
        }
    }

    /// Stop the active recording, flushing and closing its sink
    pub fn stop_recording(&mut self) -> Result<RecordingSession> {
        self.samples.remove();
        let recorder = self.recorder.take().ok_or_else(|| {
            SerialVisError::InvalidState("no recording is active".to_string())
        })?;
        recorder.stop()
    }

    /// Whether a recording is currently active
    pub fn is_recording(&self) -> bool {
        self.recorder.as_ref().map(Recorder::is_active).unwrap_or(false)
    }

    /// Current session state
    pub fn state(&mut self) -> SessionState {
        self.refresh_state();
        self.state
    }

    /// Current link status
    pub fn status(&mut self) -> LinkStatus {
        self.refresh_state();
        self.status.get()
    }

    /// Stable copy of the visualization window
    pub fn snapshot(&self) -> Vec<WindowEntry> {
        self.window.snapshot()
    }

    /// Change the visualization window capacity, keeping the newest entries
    pub fn set_window_capacity(&self, capacity: usize) {
        self.window.set_capacity(capacity);
    }

    /// Stable copy of the diagnostic log
    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.log.entries()
    }

    /// Point-in-time pipeline counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Shared handle to the visualization window
    pub fn window(&self) -> Arc<SlidingWindowBuffer> {
        self.window.clone()
    }

    fn ensure_idle(&self, operation: &str) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(SerialVisError::InvalidState(format!(
                "{} is only valid while idle (currently {})",
                operation, self.state
            )));
        }
        Ok(())
    }

    fn spawn_session(&mut self, link: Box<dyn SerialLink>) -> Result<()> {
        // A fresh session: nothing from the previous one carries over
        self.window.clear();
        self.stats.reset();

        let dispatcher = Dispatcher::new(
            self.window.clone(),
            self.log.clone(),
            self.status.clone(),
            self.samples.clone(),
            self.stats.clone(),
        );
        let (command_tx, command_rx) = bounded(COMMAND_QUEUE_CAPACITY);
        let running = Arc::new(AtomicBool::new(true));
        let worker = LinkWorker::new(
            link,
            dispatcher,
            command_rx,
            running.clone(),
            self.stats.clone(),
            self.config.link.read_chunk_size,
        );

        let handle = std::thread::Builder::new()
            .name("serialvis-link".to_string())
            .spawn(move || worker.run())
            .map_err(|e| {
                SerialVisError::Channel(format!("failed to spawn reader thread: {}", e))
            })?;

        self.session = Some(ActiveSession {
            command_tx,
            running,
            handle,
        });
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Notice a reader loop that died on its own and run the error path
    fn refresh_state(&mut self) {
        if self.state != SessionState::Connected {
            return;
        }
        let finished = self
            .session
            .as_ref()
            .map(|s| s.handle.is_finished())
            .unwrap_or(true);
        if !finished {
            return;
        }

        self.state = SessionState::Error;
        tracing::warn!("Reader loop ended on its own; cleaning up the session");
        if let Some(session) = self.session.take() {
            let _ = session.handle.join();
        }
        self.finish_recording();
        self.samples.remove();
        self.state = SessionState::Idle;
    }

    fn finish_recording(&mut self) {
        if let Some(recorder) = self.recorder.take() {
            match recorder.stop() {
                Ok(session) => tracing::info!(
                    "Recording closed: {} rows in {}",
                    session.rows_written,
                    session.path.display()
                ),
                Err(e) => tracing::warn!("Recorder shutdown failed: {}", e),
            }
        }
    }

    fn publish_status(&self, status: LinkStatus) {
        tracing::info!("Link status: {}", status);
        self.status.set(status.clone());
        self.log.append(LogEntryKind::Status(status));
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.running.store(false, Ordering::SeqCst);
            let _ = session.command_tx.try_send(LinkCommand::Shutdown);
            let _ = session.handle.join();
        }
        self.samples.remove();
        if let Some(recorder) = self.recorder.take() {
            let _ = recorder.stop();
        }
    }
}
