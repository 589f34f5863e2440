//! Request Parsing
//!
//! Turns one request line into a [`Command`]. The line is split on whitespace;
//! the first token is the verb (case-insensitive), the second is always the
//! key.

use crate::protocol::Reply;
use thiserror::Error;

/// A malformed request.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Too few tokens
    #[error("Invalid command")]
    Invalid,

    /// Unrecognized verb
    #[error("Unknown command")]
    Unknown,
}

impl From<CommandError> for Reply {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Invalid => Reply::InvalidCommand,
            CommandError::Unknown => Reply::UnknownCommand,
        }
    }
}

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `GET key`
    Get { key: String },

    /// `SET key value...` (value tokens rejoined with single spaces)
    Set { key: String, value: String },

    /// `DELETE key`
    Delete { key: String },

    /// `ZRANK key member`
    ZRank { key: String, member: String },
}

impl Command {
    /// Parses a request line.
    ///
    /// Arity is checked before the verb: any line with fewer than two tokens is
    /// [`CommandError::Invalid`], even if the verb is unknown. Tokens beyond
    /// the ones a command uses are ignored, except for `SET` where they form
    /// the value.
    ///
    /// # Example
    ///
    /// ```
    /// use minikv::commands::{Command, CommandError};
    ///
    /// let cmd = Command::parse("set greeting hello   world").unwrap();
    /// assert_eq!(
    ///     cmd,
    ///     Command::Set { key: "greeting".into(), value: "hello world".into() }
    /// );
    ///
    /// assert_eq!(Command::parse("GET"), Err(CommandError::Invalid));
    /// assert_eq!(Command::parse("FOO bar"), Err(CommandError::Unknown));
    /// ```
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            return Err(CommandError::Invalid);
        }

        let key = parts[1].to_string();

        match parts[0].to_uppercase().as_str() {
            "GET" => Ok(Command::Get { key }),
            "SET" => {
                if parts.len() < 3 {
                    return Err(CommandError::Invalid);
                }
                Ok(Command::Set {
                    key,
                    value: parts[2..].join(" "),
                })
            }
            "DELETE" => Ok(Command::Delete { key }),
            "ZRANK" => match parts.get(2) {
                Some(member) => Ok(Command::ZRank {
                    key,
                    member: member.to_string(),
                }),
                None => Err(CommandError::Invalid),
            },
            _ => Err(CommandError::Unknown),
        }
    }

    /// Returns the command's verb.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Get { .. } => "GET",
            Command::Set { .. } => "SET",
            Command::Delete { .. } => "DELETE",
            Command::ZRank { .. } => "ZRANK",
        }
    }

    /// Returns the key the command operates on.
    pub fn key(&self) -> &str {
        match self {
            Command::Get { key }
            | Command::Set { key, .. }
            | Command::Delete { key }
            | Command::ZRank { key, .. } => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get() {
        assert_eq!(
            Command::parse("GET foo"),
            Ok(Command::Get { key: "foo".into() })
        );
    }

    #[test]
    fn test_verb_is_case_insensitive() {
        assert_eq!(
            Command::parse("gEt foo"),
            Ok(Command::Get { key: "foo".into() })
        );
        assert_eq!(
            Command::parse("delete foo"),
            Ok(Command::Delete { key: "foo".into() })
        );
    }

    #[test]
    fn test_set_joins_value_tokens() {
        assert_eq!(
            Command::parse("SET  msg \thello   big\tworld \r"),
            Ok(Command::Set {
                key: "msg".into(),
                value: "hello big world".into()
            })
        );
    }

    #[test]
    fn test_set_requires_value() {
        assert_eq!(Command::parse("SET foo"), Err(CommandError::Invalid));
    }

    #[test]
    fn test_zrank_requires_member() {
        assert_eq!(Command::parse("ZRANK board"), Err(CommandError::Invalid));
        assert_eq!(
            Command::parse("zrank board alice extra"),
            Ok(Command::ZRank {
                key: "board".into(),
                member: "alice".into()
            })
        );
    }

    #[test]
    fn test_too_few_tokens() {
        assert_eq!(Command::parse(""), Err(CommandError::Invalid));
        assert_eq!(Command::parse("   "), Err(CommandError::Invalid));
        assert_eq!(Command::parse("GET"), Err(CommandError::Invalid));
        // Arity wins over an unknown verb
        assert_eq!(Command::parse("FOO"), Err(CommandError::Invalid));
    }

    #[test]
    fn test_unknown_verb() {
        assert_eq!(Command::parse("FOO bar"), Err(CommandError::Unknown));
        assert_eq!(Command::parse("DEL foo"), Err(CommandError::Unknown));
    }

    #[test]
    fn test_extra_tokens_ignored() {
        assert_eq!(
            Command::parse("GET foo bar"),
            Ok(Command::Get { key: "foo".into() })
        );
    }

    #[test]
    fn test_name_and_key() {
        let cmd = Command::parse("ZRANK board alice").unwrap();
        assert_eq!(cmd.name(), "ZRANK");
        assert_eq!(cmd.key(), "board");
    }

    #[test]
    fn test_error_text() {
        assert_eq!(CommandError::Invalid.to_string(), "Invalid command");
        assert_eq!(Reply::from(CommandError::Unknown), Reply::UnknownCommand);
    }
}
