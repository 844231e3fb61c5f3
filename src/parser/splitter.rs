//! Byte stream to line splitting
//!
//! The status heartbeat is redrawn in place with a bare `\r`, so both `\r`
//! and `\n` terminate a line. Empty lines are dropped.

/// Longest partial line kept before it is flushed as-is
const MAX_PENDING: usize = 64 * 1024;

/// Incremental splitter fed with raw terminal bytes
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every line it completes
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\n' || byte == b'\r' {
                self.take_line(&mut lines);
            } else {
                self.pending.push(byte);
                if self.pending.len() >= MAX_PENDING {
                    self.take_line(&mut lines);
                }
            }
        }
        lines
    }

    /// Flush whatever partial line remains at end of stream
    pub fn finish(&mut self) -> Option<String> {
        let mut lines = Vec::new();
        self.take_line(&mut lines);
        lines.pop()
    }

    fn take_line(&mut self, lines: &mut Vec<String>) {
        if self.pending.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }
}
