//! Response Types
//!
//! Every request produces exactly one response line. There is no separate
//! error channel: failures are ordinary human-readable lines.
//!
//! ## Examples
//!
//! ```text
//! OK
//! bar
//! 3
//! Key not found
//! Member not found
//! Invalid command
//! Unknown command
//! ```

use std::fmt;

/// The line terminator used by the protocol
pub const LF: u8 = b'\n';

/// A response to one request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The write or delete succeeded
    Ok,

    /// A stored value, rendered as text
    Value(String),

    /// A member's rank in a rank table
    Rank(i64),

    /// The key is absent or expired
    KeyNotFound,

    /// The key, the member, or a rank table at the key is missing
    MemberNotFound,

    /// Too few tokens for the command
    InvalidCommand,

    /// The verb is not one we know
    UnknownCommand,
}

impl Reply {
    /// Creates a value response.
    pub fn value(s: impl Into<String>) -> Self {
        Reply::Value(s.into())
    }

    /// Returns true for the lookup-miss and malformed-request responses.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Reply::Ok | Reply::Value(_) | Reply::Rank(_))
    }

    /// Serializes the reply to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the reply into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.to_string().as_bytes());
        buf.push(LF);
    }

    fn static_text(&self) -> &'static str {
        match self {
            Reply::Ok => "OK",
            Reply::KeyNotFound => "Key not found",
            Reply::MemberNotFound => "Member not found",
            Reply::InvalidCommand => "Invalid command",
            Reply::UnknownCommand => "Unknown command",
            Reply::Value(_) | Reply::Rank(_) => "",
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Value(s) => write_single_line(f, s),
            Reply::Rank(n) => write!(f, "{}", n),
            other => f.write_str(other.static_text()),
        }
    }
}

/// Writes `s` with line breaks escaped as `\n` and `\r`, so a stored value
/// can never split one response into several lines.
fn write_single_line(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let mut rest = s;
    while let Some(pos) = rest.find(['\n', '\r']) {
        f.write_str(&rest[..pos])?;
        f.write_str(if rest.as_bytes()[pos] == b'\n' { "\\n" } else { "\\r" })?;
        rest = &rest[pos + 1..];
    }
    f.write_str(rest)
}
