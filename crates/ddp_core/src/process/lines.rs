//! Line splitting for tool output.

/// Splits a byte stream into lines on `\n` or `\r`.
///
/// Progress meters redraw with a bare carriage return, so both count as a
/// line end. Empty lines are dropped and invalid UTF-8 is replaced.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes, returning every line completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\n' || byte == b'\r' {
                if let Some(line) = self.take() {
                    lines.push(line);
                }
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Flush a trailing line that had no terminator.
    pub fn finish(&mut self) -> Option<String> {
        self.take()
    }

    fn take(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).trim_end().to_string();
        self.pending.clear();
        if line.is_empty() {
            None
        } else {
            Some(line)
        }
    }
}
