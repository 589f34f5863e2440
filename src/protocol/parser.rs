//! Incremental Line Parser
//!
//! Requests arrive as `\n`-terminated lines over a byte stream. TCP gives no
//! message boundaries, so a read may deliver half a line or several lines at
//! once. The parser pulls one complete line at a time out of the connection's
//! buffer.
//!
//! ## How the Parser Works
//!
//! The parser reads from a buffer and returns either:
//! - `Ok(Some((line, consumed)))` - A full line, `consumed` bytes were used
//!   (including the terminator)
//! - `Ok(None)` - No terminator yet, wait for more data
//! - `Err(FrameError)` - The pending line grew past [`MAX_LINE_LENGTH`]
//!
//! The caller advances its buffer by `consumed` bytes after each line. The
//! parser remembers how much of an incomplete line it already scanned, so a
//! slowly arriving line is not searched from the start on every read.

use crate::protocol::types::LF;
use thiserror::Error;

/// Errors that can occur while framing request lines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The line exceeds the maximum allowed size
    #[error("line too long: {size} bytes (max: {max})")]
    LineTooLong { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, FrameError>;

/// Maximum size for a single request line (64 KB)
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// An incremental parser for `\n`-terminated request lines.
///
/// # Example
///
/// ```
/// use minikv::protocol::LineParser;
/// use bytes::{Buf, BytesMut};
///
/// let mut parser = LineParser::new();
/// let mut buffer = BytesMut::from(&b"SET name Ariz\r\nGET na"[..]);
///
/// let (line, consumed) = parser.parse(&buffer).unwrap().unwrap();
/// assert_eq!(line, "SET name Ariz");
/// buffer.advance(consumed);
///
/// assert!(parser.parse(&buffer).unwrap().is_none());
/// ```
#[derive(Debug)]
pub struct LineParser {
    /// Bytes of the pending line already searched for a terminator
    scanned: usize,
    max_line_length: usize,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LineParser {
    /// Creates a new parser with the default line limit.
    pub fn new() -> Self {
        Self::with_max_line_length(MAX_LINE_LENGTH)
    }

    /// Creates a parser that rejects lines longer than `max` bytes.
    pub fn with_max_line_length(max: usize) -> Self {
        Self {
            scanned: 0,
            max_line_length: max,
        }
    }

    /// Attempts to take one line from the front of `buf`.
    ///
    /// A trailing `\r` is dropped so `\r\n` clients work too. Bytes that are
    /// not valid UTF-8 are replaced rather than rejected.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(String, usize)>> {
        let start = self.scanned.min(buf.len());

        match find_lf(&buf[start..]) {
            Some(pos) => {
                let end = start + pos;
                self.scanned = 0;

                if end > self.max_line_length {
                    return Err(FrameError::LineTooLong {
                        size: end,
                        max: self.max_line_length,
                    });
                }

                let raw = &buf[..end];
                let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
                let line = String::from_utf8_lossy(raw).into_owned();

                Ok(Some((line, end + 1)))
            }
            None => {
                if buf.len() > self.max_line_length {
                    return Err(FrameError::LineTooLong {
                        size: buf.len(),
                        max: self.max_line_length,
                    });
                }
                self.scanned = buf.len();
                Ok(None)
            }
        }
    }
}

/// Convenience function to take one line from a buffer with a fresh parser.
pub fn parse_line(buf: &[u8]) -> ParseResult<Option<(String, usize)>> {
    LineParser::new().parse(buf)
}

#[inline]
fn find_lf(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == LF)
}
