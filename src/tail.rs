//! Bounded tail capture for a child's error stream.
//!
//! [`TailBuffer`] is a write sink that keeps only the most recent lines of
//! everything written to it. Completed lines live in a fixed-capacity ring and
//! the current unterminated line is held separately, so memory stays bounded
//! no matter how much output passes through.

use std::collections::VecDeque;
use std::fmt;
use std::io;

/// Number of lines retained when no explicit capacity is configured.
pub const DEFAULT_TAIL_LINES: usize = 15;

/// Longest unterminated line kept, in bytes. Older bytes of an overlong line
/// are discarded.
pub const MAX_PARTIAL_BYTES: usize = 4096;

/// Keeps the last `capacity` newline-delimited lines written to it.
#[derive(Debug, Clone)]
pub struct TailBuffer {
    capacity: usize,
    lines: VecDeque<Vec<u8>>,
    partial: Vec<u8>,
}

impl Default for TailBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_TAIL_LINES)
    }
}

impl TailBuffer {
    /// Create a buffer retaining at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            lines: VecDeque::with_capacity(capacity),
            partial: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True when no line, complete or partial, is retained.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.partial.is_empty()
    }

    /// Append a chunk. Chunks may split lines (or multi-byte characters)
    /// anywhere; boundaries are only resolved when a newline arrives.
    pub fn push(&mut self, mut chunk: &[u8]) {
        while let Some(pos) = chunk.iter().position(|&b| b == b'\n') {
            self.extend_partial(&chunk[..pos]);
            let line = std::mem::take(&mut self.partial);
            self.commit(line);
            chunk = &chunk[pos + 1..];
        }
        self.extend_partial(chunk);
    }

    /// The retained lines, oldest first. A trailing unterminated line counts
    /// as a line only when it is non-empty.
    pub fn lines(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .lines
            .iter()
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect();
        if !self.partial.is_empty() {
            out.push(String::from_utf8_lossy(&self.partial).into_owned());
        }
        let excess = out.len().saturating_sub(self.capacity);
        out.drain(..excess);
        out
    }

    fn commit(&mut self, line: Vec<u8>) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn extend_partial(&mut self, bytes: &[u8]) {
        self.partial.extend_from_slice(bytes);
        if self.partial.len() > MAX_PARTIAL_BYTES {
            let overflow = self.partial.len() - MAX_PARTIAL_BYTES;
            self.partial.drain(..overflow);
        }
    }
}

impl fmt::Display for TailBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join("\n"))
    }
}

impl io::Write for TailBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_keeps_most_recent_lines_in_order() {
        let mut tail = TailBuffer::new(15);
        for i in 1..=20 {
            writeln!(tail, "{i}").unwrap();
        }

        let expected: Vec<String> = (6..=20).map(|i| i.to_string()).collect();
        assert_eq!(tail.lines(), expected);
        assert_eq!(tail.to_string(), expected.join("\n"));
    }

    #[test]
    fn test_fewer_lines_than_capacity() {
        let mut tail = TailBuffer::new(15);
        tail.push(b"one\ntwo\nthree\n");
        assert_eq!(tail.lines(), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_partial_writes_join_into_one_line() {
        let mut tail = TailBuffer::new(15);
        tail.push(b"abc");
        tail.push(b"def\n");
        assert_eq!(tail.lines(), vec!["abcdef"]);
        assert_eq!(tail.to_string(), "abcdef");
    }

    #[test]
    fn test_empty_buffer_renders_empty() {
        let tail = TailBuffer::new(15);
        assert!(tail.is_empty());
        assert_eq!(tail.to_string(), "");
        assert!(tail.lines().is_empty());
    }

    #[test]
    fn test_no_separator_is_single_line() {
        let mut tail = TailBuffer::new(15);
        tail.push(b"no newline here");
        assert_eq!(tail.to_string(), "no newline here");
    }

    #[test]
    fn test_unterminated_last_line_counts_toward_capacity() {
        let mut tail = TailBuffer::new(3);
        tail.push(b"a\nb\nc\nd");
        assert_eq!(tail.lines(), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_blank_lines_are_preserved() {
        let mut tail = TailBuffer::new(5);
        tail.push(b"first\n\nthird\n");
        assert_eq!(tail.to_string(), "first\n\nthird");
    }

    #[test]
    fn test_split_multibyte_character() {
        let mut tail = TailBuffer::new(5);
        let text = "héllo wörld\n".as_bytes();
        // Split inside the two-byte 'é'.
        tail.push(&text[..2]);
        tail.push(&text[2..]);
        assert_eq!(tail.to_string(), "héllo wörld");
    }

    #[test]
    fn test_memory_bounded_under_volume() {
        let mut tail = TailBuffer::new(15);
        for i in 0..100_000 {
            writeln!(tail, "line {i}").unwrap();
        }
        assert_eq!(tail.lines.len(), 15);
        assert_eq!(tail.lines().last().map(String::as_str), Some("line 99999"));
    }

    #[test]
    fn test_overlong_line_keeps_its_end() {
        let mut tail = TailBuffer::new(2);
        let long = "x".repeat(MAX_PARTIAL_BYTES * 3);
        tail.push(long.as_bytes());
        tail.push(b"END");
        assert_eq!(tail.partial.len(), MAX_PARTIAL_BYTES);
        assert!(tail.to_string().ends_with("END"));
    }

    #[test]
    fn test_zero_capacity_retains_nothing() {
        let mut tail = TailBuffer::new(0);
        tail.push(b"a\nb\npartial");
        assert_eq!(tail.to_string(), "");
    }
}
