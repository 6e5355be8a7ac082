//! Reader-side worker that owns the serial transport
//!
//! The worker runs on its own thread and is the only code that ever touches
//! the link: it reads raw bytes, frames them into records, hands each record
//! to the dispatcher, and performs the queued outbound writes between reads
//! so reads and writes never interleave on the wire.
//!
//! # Cancellation
//!
//! Shutdown is cooperative. The loop checks its running flag and drains the
//! command queue between reads; the transport's read timeout bounds how long
//! a quiet port can delay that check. The thread performs its own cleanup on
//! the way out and publishes exactly one terminal status per session:
//! `Disconnected` for a clean stop, `Error` for a transport failure.

use crate::dispatch::Dispatcher;
use crate::link::{LineFramer, SerialLink};
use crate::types::{LinkStatus, PipelineStats, RawRecord};
use crossbeam_channel::{Receiver, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Commands executed on the reader thread, serialized with reads
#[derive(Debug, Clone)]
pub enum LinkCommand {
    /// Write a payload to the transport verbatim
    Write(Vec<u8>),
    /// Stop the reader loop and close the transport
    Shutdown,
}

enum Flow {
    Continue,
    Shutdown,
    Fatal(String),
}

/// The reader loop: read, frame, dispatch, drain the outbound queue
pub struct LinkWorker {
    link: Box<dyn SerialLink>,
    dispatcher: Dispatcher,
    command_rx: Receiver<LinkCommand>,
    running: Arc<AtomicBool>,
    stats: Arc<PipelineStats>,
    framer: LineFramer,
    read_chunk_size: usize,
    next_seq: u64,
    started_at: Instant,
}

impl LinkWorker {
    /// Create a worker; it takes exclusive ownership of the link
    pub fn new(
        link: Box<dyn SerialLink>,
        dispatcher: Dispatcher,
        command_rx: Receiver<LinkCommand>,
        running: Arc<AtomicBool>,
        stats: Arc<PipelineStats>,
        read_chunk_size: usize,
    ) -> Self {
        Self {
            link,
            dispatcher,
            command_rx,
            running,
            stats,
            framer: LineFramer::new(),
            read_chunk_size: read_chunk_size.max(1),
            next_seq: 0,
            started_at: Instant::now(),
        }
    }

    /// Run until shutdown or a fatal transport error
    pub fn run(mut self) {
        let port = self.link.name().to_string();
        let baud = self.link.baud();
        self.dispatcher
            .publish_status(LinkStatus::Connected {
                port: port.clone(),
                baud,
            });
        tracing::info!("Serial reader started on {} at {} baud", port, baud);

        let mut buf = vec![0u8; self.read_chunk_size];
        let mut fatal: Option<String> = None;

        while self.running.load(Ordering::SeqCst) {
            match self.process_commands() {
                Flow::Continue => {}
                Flow::Shutdown => break,
                Flow::Fatal(cause) => {
                    fatal = Some(cause);
                    break;
                }
            }

            match self.link.read(&mut buf) {
                // Read timeout: loop so cancellation and commands are observed
                Ok(0) => {}
                Ok(n) => self.ingest_bytes(&buf[..n]),
                Err(e) => {
                    fatal = Some(e.to_string());
                    break;
                }
            }
        }

        let discarded = self.framer.pending_len();
        if discarded > 0 {
            tracing::debug!("Discarding {} unterminated trailing bytes", discarded);
        }

        // Exactly one terminal status per session
        match fatal {
            Some(cause) => {
                tracing::error!("Transport failure on {}: {}", port, cause);
                self.dispatcher.publish_status(LinkStatus::Error { cause });
            }
            None => self.dispatcher.publish_status(LinkStatus::Disconnected {
                reason: "Disconnected.".to_string(),
            }),
        }
        tracing::info!("Serial reader stopped on {}", port);
    }

    /// Drain the command queue; writes happen here, between reads
    fn process_commands(&mut self) -> Flow {
        loop {
            match self.command_rx.try_recv() {
                Ok(LinkCommand::Write(bytes)) => match self.link.write_all(&bytes) {
                    Ok(()) => self.dispatcher.publish_tx(&bytes),
                    Err(e) => return Flow::Fatal(format!("write failed: {}", e)),
                },
                Ok(LinkCommand::Shutdown) => return Flow::Shutdown,
                Err(TryRecvError::Empty) => return Flow::Continue,
                Err(TryRecvError::Disconnected) => return Flow::Shutdown,
            }
        }
    }

    fn ingest_bytes(&mut self, bytes: &[u8]) {
        self.stats
            .bytes_read
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        for frame in self.framer.push(bytes) {
            let record = RawRecord::new(self.next_seq, self.started_at.elapsed(), frame);
            self.next_seq += 1;
            self.dispatcher.ingest(record);
        }
    }
}
