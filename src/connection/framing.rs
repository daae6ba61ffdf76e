//! Ingress line framing.
//!
//! Received bytes are accumulated and split on every CR or LF byte; each
//! surviving line is stripped of a leading run of `NUL`, `HT`, `CR`, `LF`
//! and `SP` bytes, and empty lines are dropped.

/// Bytes stripped from the start of every incoming line.
const LEADING_WHITESPACE: &[u8] = b"\0\t\r\n ";

/// Accumulating splitter for the raw ingress byte stream.
#[derive(Default)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends received bytes to the buffer.
    pub(crate) fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Drains the next complete, non-empty line from the buffer.
    ///
    /// Returns `None` once no complete line remains; a partial line stays
    /// buffered until its terminator arrives.
    pub(crate) fn next_line(&mut self) -> Option<String> {
        loop {
            let end = self.buf.iter().position(|&b| b == b'\r' || b == b'\n')?;
            let mut line: Vec<u8> = self.buf.drain(..=end).collect();
            // Drop the delimiter; CRLF pairs produce one empty line which
            // falls through below.
            line.truncate(line.len() - 1);

            let start = line
                .iter()
                .position(|b| !LEADING_WHITESPACE.contains(b))
                .unwrap_or(line.len());
            if start < line.len() {
                return Some(String::from_utf8_lossy(&line[start..]).into_owned());
            }
        }
    }
}
