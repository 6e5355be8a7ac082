//! Newline framing of the raw byte stream

/// Splits the inbound byte stream into newline-delimited records
///
/// Bytes are buffered until a `\n` is observed; a record is emitted only for
/// a complete frame. A trailing `\r` is stripped and empty frames are
/// skipped. An unterminated fragment left at end-of-stream stays buffered
/// and is discarded with the framer, never emitted as a partial record.
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
}

impl LineFramer {
    /// Create an empty framer
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the complete frames observed, in order
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        for &byte in bytes {
            if byte == b'\n' {
                let mut frame = std::mem::take(&mut self.pending);
                if frame.last() == Some(&b'\r') {
                    frame.pop();
                }
                if !frame.is_empty() {
                    frames.push(frame);
                }
            } else {
                self.pending.push(byte);
            }
        }
        frames
    }

    /// Bytes buffered waiting for a line terminator
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_complete_frame() {
        let mut framer = LineFramer::new();
        let frames = framer.push(b"1.0,2.0\n");
        assert_eq!(frames, vec![b"1.0,2.0".to_vec()]);
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"1.0,").is_empty());
        assert!(framer.push(b"2.0").is_empty());
        let frames = framer.push(b"\n3.0");
        assert_eq!(frames, vec![b"1.0,2.0".to_vec()]);
        assert_eq!(framer.pending_len(), 3);
    }

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let mut framer = LineFramer::new();
        let frames = framer.push(b"1\n2\n3\n");
        assert_eq!(frames, vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]);
    }

    #[test]
    fn test_crlf_terminator_stripped() {
        let mut framer = LineFramer::new();
        let frames = framer.push(b"1.0,2.0\r\n");
        assert_eq!(frames, vec![b"1.0,2.0".to_vec()]);
    }

    #[test]
    fn test_empty_lines_skipped() {
        let mut framer = LineFramer::new();
        let frames = framer.push(b"\n\r\n1.0\n\n");
        assert_eq!(frames, vec![b"1.0".to_vec()]);
    }

    #[test]
    fn test_unterminated_fragment_stays_pending() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"0.5,0.6").is_empty());
        assert_eq!(framer.pending_len(), 7);
    }
}
