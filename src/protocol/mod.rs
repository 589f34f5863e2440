//! Line Protocol Implementation
//!
//! MiniKV speaks a plain text protocol: one request per `\n`-terminated line,
//! one response per line.
//!
//! ## Modules
//!
//! - `types`: Defines the `Reply` enum and serialization
//! - `parser`: Incremental line framing for incoming data
//!
//! ## Example
//!
//! ```
//! use minikv::protocol::{parse_line, Reply};
//!
//! let data = b"GET name\n";
//! let (line, consumed) = parse_line(data).unwrap().unwrap();
//! assert_eq!((line.as_str(), consumed), ("GET name", 9));
//!
//! let bytes = Reply::value("Ariz").serialize();
//! assert_eq!(bytes, b"Ariz\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_line, FrameError, LineParser, ParseResult, MAX_LINE_LENGTH};
pub use types::Reply;
