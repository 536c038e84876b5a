use anyhow::{Context, Result};

/// result of feeding one byte to a [`LineBuffer`]
#[derive(Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// byte stored as part of the current line
    Appended,
    /// terminator seen while nothing was buffered
    Skipped,
    /// terminator closed a non-empty line, raw bytes handed back
    Completed(Vec<u8>),
}

/// accumulates the bytes of the line currently being assembled
///
/// `\r` and `\n` both terminate a line. The buffer survives across chunks, so a
/// line split over two fetch windows is reassembled.
#[derive(Debug, Default)]
pub struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, byte: u8) -> PushOutcome {
        match byte {
            b'\r' | b'\n' if self.bytes.is_empty() => PushOutcome::Skipped,
            b'\r' | b'\n' => PushOutcome::Completed(std::mem::take(&mut self.bytes)),
            _ => {
                self.bytes.push(byte);
                PushOutcome::Appended
            }
        }
    }

    /// decode a completed line as UTF-8 and trim surrounding whitespace
    pub fn decode(bytes: Vec<u8>) -> Result<String> {
        let len = bytes.len();
        let line = String::from_utf8(bytes)
            .with_context(|| format!("log line of {} bytes is not valid UTF-8", len))?;
        Ok(line.trim().to_string())
    }

    /// drop a partially assembled line
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(buffer: &mut LineBuffer, input: &[u8]) -> Vec<Vec<u8>> {
        input
            .iter()
            .filter_map(|&b| match buffer.push(b) {
                PushOutcome::Completed(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_single_line() {
        let mut buffer = LineBuffer::new();
        assert_eq!(feed(&mut buffer, b"hello\n"), vec![b"hello".to_vec()]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_crlf_and_blank_lines_are_skipped() {
        let mut buffer = LineBuffer::new();
        let lines = feed(&mut buffer, b"\n\na\r\n\r\nb\n");
        assert_eq!(lines, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn test_unterminated_tail_stays_buffered() {
        let mut buffer = LineBuffer::new();
        assert!(feed(&mut buffer, b"ab").is_empty());
        assert_eq!(buffer.len(), 2);
        assert_eq!(feed(&mut buffer, b"c\n"), vec![b"abc".to_vec()]);
    }

    #[test]
    fn test_clear_drops_fragment() {
        let mut buffer = LineBuffer::new();
        feed(&mut buffer, b"half");
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(feed(&mut buffer, b"new\n"), vec![b"new".to_vec()]);
    }

    #[test]
    fn test_push_outcomes() {
        let mut buffer = LineBuffer::new();
        assert_eq!(buffer.push(b'\r'), PushOutcome::Skipped);
        assert_eq!(buffer.push(b'x'), PushOutcome::Appended);
        assert_eq!(buffer.push(b'\r'), PushOutcome::Completed(b"x".to_vec()));
    }

    #[test]
    fn test_decode_trims() {
        let line = LineBuffer::decode(b"  \tready to go \x0b".to_vec()).unwrap();
        assert_eq!(line, "ready to go");
    }

    #[test]
    fn test_decode_multibyte() {
        let line = LineBuffer::decode("ツ ok".as_bytes().to_vec()).unwrap();
        assert_eq!(line, "ツ ok");
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let err = LineBuffer::decode(vec![b'a', 0xff, b'b']).unwrap_err();
        assert!(err.downcast_ref::<std::string::FromUtf8Error>().is_some());
        assert!(err.to_string().contains("3 bytes"));
    }

    #[test]
    fn test_whitespace_only_line_decodes_empty() {
        let line = LineBuffer::decode(b"   ".to_vec()).unwrap();
        assert_eq!(line, "");
    }
}
