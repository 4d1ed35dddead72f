//! # ASCII Line Buffer
//!
//! Streaming text mode prints with the device's built-in font. The device
//! commits a line when it receives `\n` or when the line reaches the model's
//! character width, so the buffer only releases text the device will print
//! right away and holds the trailing partial line until more arrives or the
//! caller flushes.
//!
//! ```text
//! push("hello wor")  → ready: ""            pending: "hello wor"
//! push("ld\nbye")    → ready: "hello world\n" pending: "bye"
//! finish()           → "bye\n"
//! ```

use log::warn;

use crate::render::text::filter_ascii;

/// Pending device-font text for one printer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiLineBuffer {
    pending: String,
    chars_per_line: usize,
}

impl AsciiLineBuffer {
    pub fn new(chars_per_line: usize) -> Self {
        Self {
            pending: String::new(),
            chars_per_line: chars_per_line.max(1),
        }
    }

    /// Append `text` after dropping everything outside printable ASCII.
    ///
    /// Returns the text that is ready to send: every complete line plus any
    /// full-width segments of the line in progress. Empty if nothing is ready.
    pub fn push(&mut self, text: &str) -> String {
        let filtered = filter_ascii(text);
        if filtered.dropped > 0 {
            warn!(
                "Dropped {} character(s) the device font cannot print",
                filtered.dropped
            );
        }
        self.pending.push_str(&filtered.text);
        self.take_ready()
    }

    /// Everything still pending, terminated with `\n` so the device commits
    /// it. `None` if the buffer is empty.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let mut text = std::mem::take(&mut self.pending);
        text.push('\n');
        Some(text)
    }

    /// Text waiting for a newline or flush.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn take_ready(&mut self) -> String {
        // Filtered text is pure ASCII, so byte offsets are char offsets
        let line_start = self.pending.rfind('\n').map_or(0, |pos| pos + 1);
        let tail = self.pending.len() - line_start;
        let full_segments = tail / self.chars_per_line * self.chars_per_line;
        let split = line_start + full_segments;

        let rest = self.pending.split_off(split);
        std::mem::replace(&mut self.pending, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holds_partial_line() {
        let mut buffer = AsciiLineBuffer::new(32);
        assert_eq!(buffer.push("hello wor"), "");
        assert_eq!(buffer.pending(), "hello wor");
        assert_eq!(buffer.push("ld\nbye"), "hello world\n");
        assert_eq!(buffer.pending(), "bye");
        assert_eq!(buffer.finish().as_deref(), Some("bye\n"));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_finish_empty_is_none() {
        let mut buffer = AsciiLineBuffer::new(32);
        assert_eq!(buffer.finish(), None);
        buffer.push("line\n");
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn test_releases_full_width_segments() {
        let mut buffer = AsciiLineBuffer::new(4);
        assert_eq!(buffer.push("abcdefghij"), "abcdefgh");
        assert_eq!(buffer.pending(), "ij");
    }

    #[test]
    fn test_segments_after_last_newline() {
        let mut buffer = AsciiLineBuffer::new(4);
        assert_eq!(buffer.push("x\nabcdef"), "x\nabcd");
        assert_eq!(buffer.pending(), "ef");
    }

    #[test]
    fn test_filters_non_ascii() {
        let mut buffer = AsciiLineBuffer::new(32);
        assert_eq!(buffer.push("café ☕\n"), "caf \n");
    }

    #[test]
    fn test_empty_line() {
        let mut buffer = AsciiLineBuffer::new(32);
        assert_eq!(buffer.push("\n"), "\n");
    }
}
