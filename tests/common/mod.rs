//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

use serialvis_rs::error::{Result, SerialVisError};
use serialvis_rs::link::SerialLink;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// One scripted read of a [`ScriptedLink`]
pub enum ScriptedRead {
    /// Deliver these bytes
    Data(Vec<u8>),
    /// Report no data for one read interval
    Idle,
    /// Fail with a transport error
    Fail(String),
}

/// In-memory serial link driven by a script, for integration tests
///
/// Once the script is exhausted the link idles forever, like a quiet real
/// port; writes are captured for assertions.
pub struct ScriptedLink {
    name: String,
    baud: u32,
    reads: VecDeque<ScriptedRead>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl ScriptedLink {
    pub fn new(name: impl Into<String>, baud: u32) -> Self {
        Self {
            name: name.into(),
            baud,
            reads: VecDeque::new(),
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append a chunk of inbound bytes to the script
    pub fn data(mut self, bytes: &[u8]) -> Self {
        self.reads.push_back(ScriptedRead::Data(bytes.to_vec()));
        self
    }

    /// End the script with a transport failure
    pub fn fail(mut self, cause: &str) -> Self {
        self.reads.push_back(ScriptedRead::Fail(cause.to_string()));
        self
    }

    /// Handle to the bytes written to the link
    pub fn written(&self) -> Arc<Mutex<Vec<u8>>> {
        self.written.clone()
    }
}

impl SerialLink for ScriptedLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn baud(&self) -> u32 {
        self.baud
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.reads.pop_front() {
            Some(ScriptedRead::Data(mut bytes)) => {
                if bytes.len() > buf.len() {
                    let rest = bytes.split_off(buf.len());
                    self.reads.push_front(ScriptedRead::Data(rest));
                }
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            Some(ScriptedRead::Idle) | None => {
                std::thread::sleep(Duration::from_millis(10));
                Ok(0)
            }
            Some(ScriptedRead::Fail(cause)) => Err(SerialVisError::Transport(cause)),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut written = self.written.lock().unwrap();
        written.extend_from_slice(bytes);
        Ok(())
    }
}

/// Poll `condition` until it holds or the test deadline expires
pub fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met in time");
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Initialize test logging once; safe to call from every test
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}
