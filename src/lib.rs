//! # SerialVis-RS: serial data acquisition pipeline
//!
//! A real-time acquisition-and-distribution pipeline for numeric sample
//! streams arriving over a serial link. One dedicated thread owns all
//! physical I/O; parsed samples fan out to independently-paced consumers
//! (a sliding window for live plotting, a diagnostic event log, and an
//! optional CSV recorder) without the producer ever blocking on any of
//! them.
//!
//! ## Architecture
//!
//! - **Link**: owns the transport; reads, frames newline-delimited records,
//!   and performs queued outbound writes on a dedicated thread
//! - **Parser**: pure mapping from a framed record to a typed sample
//! - **Dispatcher**: tiered fan-out (coalescing / queued-bounded /
//!   best-effort), one backpressure policy per subscriber class
//! - **Recorder**: crash-safe CSV persistence on its own writer thread
//! - **Supervisor**: lifecycle state machine and the interface the UI layer
//!   calls
//! - **Communication**: crossbeam channels for thread-safe data transfer
//!
//! ```text
//! SerialLink -> LineFramer -> parse_record -> Dispatcher -+-> SlidingWindowBuffer
//!                                                         +-> Recorder (CSV)
//!                                                         +-> EventLog
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use serialvis_rs::{config::PipelineConfig, supervisor::Supervisor};
//!
//! let mut supervisor = Supervisor::new(PipelineConfig::default());
//! supervisor.connect("/dev/ttyUSB0", 115_200)?;
//! supervisor.start_recording("capture.csv")?;
//!
//! // The UI thread polls, never blocks:
//! let window = supervisor.snapshot();
//! let status = supervisor.status();
//!
//! supervisor.stop_recording()?;
//! supervisor.disconnect()?;
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod eventlog;
pub mod link;
pub mod parser;
pub mod recorder;
pub mod supervisor;
pub mod types;
pub mod window;

// Re-export commonly used types
pub use config::{AppState, PipelineConfig};
pub use error::{Result, SerialVisError};
pub use eventlog::{EventLog, LogEntry, LogEntryKind};
pub use recorder::{Recorder, RecordingSession};
pub use supervisor::{SessionState, Supervisor};
pub use types::{LinkStatus, ParseOutcome, RawRecord, Sample, StatsSnapshot};
pub use window::{SlidingWindowBuffer, WindowEntry};
