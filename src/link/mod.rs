//! Serial link module: transport capability, line framing, and the reader
//! worker
//!
//! All physical I/O happens on one dedicated thread that owns the transport
//! exclusively. Outbound writes are enqueued by other threads and performed
//! by the same thread as the reads, so reads and writes never interleave on
//! the wire and no other context ever touches the raw handle.
//!
//! # Components
//!
//! - [`SerialLink`] - The capability consumed from the transport layer:
//!   open/read/write on a named serial endpoint at a given baud rate
//! - [`SystemLink`] - Production implementation over the `serialport` crate
//! - [`MockLink`] - Scripted in-memory link for running without hardware
//!   (feature `mock-link`)
//! - [`LineFramer`] - Splits the raw byte stream into newline-delimited
//!   records
//! - [`LinkWorker`] - The reader loop: read, frame, dispatch, drain the
//!   outbound queue

pub mod framer;
#[cfg(any(test, feature = "mock-link"))]
pub mod mock;
pub mod worker;

pub use framer::LineFramer;
#[cfg(any(test, feature = "mock-link"))]
pub use mock::{MockLink, MockStep};
pub use worker::{LinkCommand, LinkWorker};

use crate::error::{Result, SerialVisError};
use std::io::{Read, Write};
use std::time::Duration;

/// Transport read timeout; the reader observes cancellation between reads
pub const READ_TIMEOUT: Duration = Duration::from_millis(20);

/// A named serial endpoint yielding raw bytes or an error
///
/// This is the boundary to the excluded transport layer. Implementations
/// must return `Ok(0)` from [`SerialLink::read`] when no data arrived within
/// the transport's read timeout, so the reader loop can poll its
/// cancellation flag; any `Err` is fatal to the session.
pub trait SerialLink: Send {
    /// Port name the link was opened on
    fn name(&self) -> &str;

    /// Baud rate the link was opened at
    fn baud(&self) -> u32;

    /// Read available bytes, blocking at most the read timeout
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write a payload to the transport verbatim
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Production serial transport backed by the `serialport` crate
pub struct SystemLink {
    port: Box<dyn serialport::SerialPort>,
    name: String,
    baud: u32,
}

impl SystemLink {
    /// Open a system serial port at the given baud rate
    pub fn open(name: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(name, baud)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| {
                SerialVisError::Transport(format!("failed to open {}: {}", name, e))
            })?;
        tracing::info!("Opened serial port {} at {} baud", name, baud);
        Ok(Self {
            port,
            name: name.to_string(),
            baud,
        })
    }
}

impl SerialLink for SystemLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn baud(&self) -> u32 {
        self.baud
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::Interrupted =>
            {
                Ok(0)
            }
            Err(e) => Err(SerialVisError::Transport(e.to_string())),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.port
            .write_all(bytes)
            .map_err(|e| SerialVisError::Transport(format!("write failed: {}", e)))
    }
}
