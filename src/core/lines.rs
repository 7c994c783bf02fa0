// Oxygen - core/lines.rs
//
// Newline splitting for the log tail.
//
// Bytes are buffered undecoded until a newline arrives, so a multi-byte
// UTF-8 sequence split across two reads is decoded intact. Complete lines are
// decoded as lossy UTF-8, trimmed of trailing whitespace, and dropped when
// blank.

use crate::core::model::LogLine;
use crate::util::constants::MAX_PARTIAL_LINE_BYTES;

/// Split a whole buffer into lines, including an unterminated final line.
///
/// Used for the bulk read performed when the watcher switches files.
pub fn split_all(bytes: &[u8]) -> Vec<LogLine> {
    bytes
        .split(|&b| b == b'\n')
        .filter_map(|raw| LogLine::from_text(&String::from_utf8_lossy(raw)))
        .collect()
}

/// Incremental splitter that holds back the trailing fragment.
#[derive(Debug, Default)]
pub struct LineBuffer {
    /// Bytes after the most recent newline: an in-progress line.
    partial: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly read bytes and return every line they complete.
    ///
    /// The final fragment (no trailing newline yet) is kept and prepended to
    /// the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<LogLine> {
        self.partial.extend_from_slice(bytes);

        let Some(last_nl) = self.partial.iter().rposition(|&b| b == b'\n') else {
            if self.partial.len() > MAX_PARTIAL_LINE_BYTES {
                tracing::warn!(
                    bytes = self.partial.len(),
                    limit = MAX_PARTIAL_LINE_BYTES,
                    "Tail: unterminated line exceeds limit, discarding fragment"
                );
                self.partial.clear();
            }
            return Vec::new();
        };

        let rest = self.partial.split_off(last_nl + 1);
        let complete = std::mem::replace(&mut self.partial, rest);
        split_all(&complete)
    }

    /// Drop any held-back fragment (used on truncation and rotation).
    pub fn clear(&mut self) {
        self.partial.clear();
    }

    /// Number of bytes currently held back.
    pub fn pending(&self) -> usize {
        self.partial.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: &[LogLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn test_split_all_drops_blank_lines_and_keeps_order() {
        let lines = split_all(b"one\n\n  \ntwo\r\nthree");
        assert_eq!(texts(&lines), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_feed_holds_back_unterminated_fragment() {
        let mut buf = LineBuffer::new();
        assert!(buf.feed(b"hel").is_empty());
        assert_eq!(buf.pending(), 3);
        let lines = buf.feed(b"lo\nwor");
        assert_eq!(texts(&lines), vec!["hello"]);
        let lines = buf.feed(b"ld\n");
        assert_eq!(texts(&lines), vec!["world"]);
        assert_eq!(buf.pending(), 0);
    }

    #[test]
    fn test_feed_reassembles_split_utf8_sequence() {
        let mut buf = LineBuffer::new();
        let bytes = "café\n".as_bytes();
        // Split inside the two-byte 'é'.
        assert!(buf.feed(&bytes[..4]).is_empty());
        let lines = buf.feed(&bytes[4..]);
        assert_eq!(texts(&lines), vec!["café"]);
    }

    #[test]
    fn test_clear_discards_fragment() {
        let mut buf = LineBuffer::new();
        buf.feed(b"stale");
        buf.clear();
        let lines = buf.feed(b"fresh\n");
        assert_eq!(texts(&lines), vec!["fresh"]);
    }

    #[test]
    fn test_oversized_fragment_is_discarded() {
        let mut buf = LineBuffer::new();
        let big = vec![b'x'; MAX_PARTIAL_LINE_BYTES + 1];
        assert!(buf.feed(&big).is_empty());
        assert_eq!(buf.pending(), 0);
    }
}
