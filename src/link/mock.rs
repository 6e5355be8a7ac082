//! Mock serial link for running the pipeline without hardware
//!
//! Reads follow a script of [`MockStep`]s: deliver bytes, idle for one read
//! interval, or fail with a transport error. Once the script is exhausted
//! the link idles forever, so the reader loop keeps polling its cancellation
//! flag exactly as it would on a quiet real port. Writes are captured in a
//! shared buffer that tests can inspect.
//!
//! # Enabling
//!
//! Outside of unit tests the mock link is only available when the
//! `mock-link` feature is enabled:
//!
//! ```bash
//! cargo test --features mock-link
//! ```

use super::{SerialLink, READ_TIMEOUT};
use crate::error::{Result, SerialVisError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One scripted step of a [`MockLink`]'s read behavior
#[derive(Debug, Clone)]
pub enum MockStep {
    /// Deliver these bytes on the next read
    Data(Vec<u8>),
    /// Report no data for one read interval
    Idle,
    /// Fail the read with a transport error
    Fail(String),
}

/// Scripted in-memory serial link
pub struct MockLink {
    name: String,
    baud: u32,
    script: VecDeque<MockStep>,
    written: Arc<Mutex<Vec<u8>>>,
    fail_writes: bool,
}

impl MockLink {
    /// Create a mock link with an empty script (idles forever)
    pub fn new(name: impl Into<String>, baud: u32) -> Self {
        Self {
            name: name.into(),
            baud,
            script: VecDeque::new(),
            written: Arc::new(Mutex::new(Vec::new())),
            fail_writes: false,
        }
    }

    /// Append a chunk of inbound bytes to the script
    pub fn with_data(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.script.push_back(MockStep::Data(bytes.into()));
        self
    }

    /// Append an arbitrary step to the script
    pub fn with_step(mut self, step: MockStep) -> Self {
        self.script.push_back(step);
        self
    }

    /// End the script with a transport failure
    pub fn then_fail(mut self, cause: impl Into<String>) -> Self {
        self.script.push_back(MockStep::Fail(cause.into()));
        self
    }

    /// Make every write fail with a transport error
    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Handle to the bytes written to the link, for test assertions
    pub fn written(&self) -> Arc<Mutex<Vec<u8>>> {
        self.written.clone()
    }
}

impl SerialLink for MockLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn baud(&self) -> u32 {
        self.baud
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.script.pop_front() {
            Some(MockStep::Data(mut bytes)) => {
                if bytes.len() > buf.len() {
                    // Deliver what fits, requeue the rest
                    let rest = bytes.split_off(buf.len());
                    self.script.push_front(MockStep::Data(rest));
                }
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            Some(MockStep::Idle) | None => {
                std::thread::sleep(READ_TIMEOUT);
                Ok(0)
            }
            Some(MockStep::Fail(cause)) => Err(SerialVisError::Transport(cause)),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(SerialVisError::Transport("write failed".to_string()));
        }
        let mut written = self.written.lock().unwrap_or_else(|e| e.into_inner());
        written.extend_from_slice(bytes);
        Ok(())
    }
}
