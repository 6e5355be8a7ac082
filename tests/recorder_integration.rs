//! Integration tests for CSV recording through the full pipeline
//!
//! These tests validate the recording workflow end to end:
//! - Header and row fidelity against the inbound wire text
//! - Flush-and-close guarantees on stop and on disconnect
//! - Failure isolation between the sink and the acquisition side

mod common;

use common::{wait_until, ScriptedLink};
use serialvis_rs::config::PipelineConfig;
use serialvis_rs::error::SerialVisError;
use serialvis_rs::supervisor::Supervisor;

#[test]
fn test_recording_round_trip() {
    common::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.csv");

    let mut supervisor = Supervisor::new(PipelineConfig::default());
    supervisor.start_recording(&path).unwrap();

    let link = ScriptedLink::new("scripted0", 115_200)
        .data(b"1.0,2.0\n")
        .data(b"3.0,4.0\n")
        .data(b"bad,4.0\n")
        .data(b"5.0,6.0\n");
    supervisor.connect_link(Box::new(link)).unwrap();
    wait_until(|| supervisor.stats().samples_parsed == 3);
    supervisor.disconnect().unwrap();

    // Disconnect closed the recording; the sink holds one header row and
    // one row per accepted sample, verbatim. The malformed line produced
    // zero rows.
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "channel1,channel2\n1.0,2.0\n3.0,4.0\n5.0,6.0\n");
    assert!(!supervisor.is_recording());
}

#[test]
fn test_explicit_stop_reports_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.csv");

    let mut supervisor = Supervisor::new(PipelineConfig::default());
    supervisor.start_recording(&path).unwrap();

    let link = ScriptedLink::new("scripted0", 9600).data(b"0.5\n1.5\n");
    supervisor.connect_link(Box::new(link)).unwrap();
    wait_until(|| supervisor.stats().samples_parsed == 2);

    let session = supervisor.stop_recording().unwrap();
    assert_eq!(session.rows_written, 2);
    assert_eq!(session.channels, Some(1));
    assert!(!session.failed);

    // Acquisition continues after the recording stops
    supervisor.send_command("PING\n").unwrap();
    supervisor.disconnect().unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "channel1\n0.5\n1.5\n");
}

#[test]
fn test_sink_failure_does_not_stop_acquisition() {
    let dir = tempfile::tempdir().unwrap();

    let mut supervisor = Supervisor::new(PipelineConfig::default());
    // A directory is not a creatable file; the recording never starts
    let result = supervisor.start_recording(dir.path());
    assert!(matches!(result, Err(SerialVisError::Sink(_))));

    let link = ScriptedLink::new("scripted0", 9600).data(b"1.0,2.0\n");
    supervisor.connect_link(Box::new(link)).unwrap();
    wait_until(|| supervisor.stats().samples_parsed == 1);
    assert_eq!(supervisor.snapshot().len(), 1);

    supervisor.disconnect().unwrap();
}

#[test]
fn test_second_recording_after_stop() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");

    let mut supervisor = Supervisor::new(PipelineConfig::default());
    supervisor.start_recording(&first).unwrap();

    let link = ScriptedLink::new("scripted0", 9600).data(b"1.0\n");
    supervisor.connect_link(Box::new(link)).unwrap();
    wait_until(|| supervisor.stats().samples_parsed == 1);
    supervisor.stop_recording().unwrap();

    // A new recording gets its own sink and its own header
    supervisor.start_recording(&second).unwrap();
    supervisor.disconnect().unwrap();

    assert_eq!(
        std::fs::read_to_string(&first).unwrap(),
        "channel1\n1.0\n"
    );
    // No samples arrived during the second recording: empty sink, no header
    assert_eq!(std::fs::read_to_string(&second).unwrap(), "");
}
