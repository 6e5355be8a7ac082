//! Line-oriented sample parsing
//!
//! The wire protocol is ASCII text: one record per line, fields separated by
//! commas, each field a decimal number (e.g. `1.23,4.56,7.89`). The channel
//! count is inferred from the first valid record of a session and fixed
//! thereafter; a later record with a different field count is rejected as
//! malformed, never reinterpreted as a schema change.
//!
//! Parsing is pure and side-effect-free. The established channel count is
//! owned by the dispatcher and passed in per call, which keeps this module
//! stateless and independently testable.

use crate::types::{ParseOutcome, RawRecord, Sample};

/// Parse one framed record into a [`Sample`]
///
/// `expected_channels` is the session's established channel count, or `None`
/// if no record has parsed successfully yet.
pub fn parse_record(raw: &RawRecord, expected_channels: Option<usize>) -> ParseOutcome {
    let text = match std::str::from_utf8(&raw.bytes) {
        Ok(text) => text.trim(),
        Err(_) => return malformed(raw, "record is not valid UTF-8".to_string()),
    };

    if text.is_empty() {
        return malformed(raw, "empty record".to_string());
    }

    let mut values = Vec::new();
    for (index, field) in text.split(',').enumerate() {
        let field = field.trim();
        match field.parse::<f64>() {
            Ok(value) => values.push(value),
            Err(_) => {
                return malformed(
                    raw,
                    format!("field {} is not numeric: '{}'", index + 1, field),
                );
            }
        }
    }

    if let Some(expected) = expected_channels {
        if values.len() != expected {
            return malformed(
                raw,
                format!("expected {} fields, got {}", expected, values.len()),
            );
        }
    }

    ParseOutcome::Sample(Sample {
        seq: raw.seq,
        timestamp: raw.timestamp,
        values,
        text: text.to_string(),
    })
}

fn malformed(raw: &RawRecord, reason: String) -> ParseOutcome {
    ParseOutcome::Malformed {
        raw: raw.bytes.clone(),
        reason,
    }
}
