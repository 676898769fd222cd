//! Accumulation buffer shared by the pattern and timing reads.

use std::borrow::Cow;

use regex::Regex;

use super::ansi::strip_ansi;

/// Decoded channel output collected across polls.
///
/// Control sequences are kept while accumulating so a pattern that spans
/// two polls still sees the bytes the device sent; they are stripped once,
/// when the buffer is handed back to the caller.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    buffer: String,
}

impl OutputBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            buffer: String::with_capacity(4096),
        }
    }

    /// Append newly read text.
    pub fn push_str(&mut self, data: &str) {
        self.buffer.push_str(data);
    }

    /// Search the whole buffer for `pattern`.
    pub fn is_match(&self, pattern: &Regex) -> bool {
        pattern.is_match(&self.buffer)
    }

    /// Get the buffer contents.
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Get the current buffer length in bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consume the buffer, returning its contents with control sequences removed.
    pub fn into_stripped(self) -> String {
        let stripped = match strip_ansi(&self.buffer) {
            Cow::Owned(stripped) => Some(stripped),
            Cow::Borrowed(_) => None,
        };
        stripped.unwrap_or(self.buffer)
    }
}
