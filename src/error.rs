//! Error handling for the SerialVis-RS pipeline
//!
//! This module defines the crate-wide error type and a Result alias. The
//! variants mirror how failures propagate through the pipeline:
//!
//! - [`SerialVisError::Transport`] is fatal to the acquisition session; the
//!   reader loop terminates and the supervisor must run a clean re-connect
//!   cycle.
//! - [`SerialVisError::Parse`] is recoverable and isolated per record; it is
//!   logged and never reaches the plotting or recording subscribers.
//! - [`SerialVisError::Sink`] is fatal to the recording session only;
//!   acquisition and plotting continue uninterrupted.
//! - [`SerialVisError::Overflow`] is recoverable and surfaced as a
//!   dropped-count diagnostic, never as a pipeline failure.

use thiserror::Error;

/// Main error type for SerialVis-RS operations
#[derive(Error, Debug)]
pub enum SerialVisError {
    /// Errors from the serial transport (device unreachable, removed, revoked)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed inbound record
    #[error("Parse error: {0}")]
    Parse(String),

    /// Recording sink I/O failure (disk full, permission revoked)
    #[error("Sink error: {0}")]
    Sink(String),

    /// A bounded queue exceeded its capacity
    #[error("Overflow: {0}")]
    Overflow(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// The supervisor is not in a state where the requested operation is valid
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<SerialVisError>,
    },
}

impl SerialVisError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        SerialVisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error terminates the acquisition session
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(self, SerialVisError::Transport(_))
    }
}

impl From<serialport::Error> for SerialVisError {
    fn from(err: serialport::Error) -> Self {
        SerialVisError::Transport(err.to_string())
    }
}

/// Result type alias for SerialVis-RS operations
pub type Result<T> = std::result::Result<T, SerialVisError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
