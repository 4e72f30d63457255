//! Text codec for session event logs: one event per line, readable by people
//! and by `parser::decode`.

pub mod format;
pub mod parser;
pub mod scanner;

pub use format::{format_event, format_payload, EventLog};
pub use parser::{decode, decode_file, parse_line, DecodedLog, ParsedLine};
