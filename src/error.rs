// src/error.rs

//! Small helpers for building domain [`io::Error`]s.
//!
//! The crate propagates `io::Error` throughout rather than introducing an error-enum crate, for
//! problems that have no underlying OS error code.

use std::io;

/// Build an `io::Error` for a configuration problem, identifying the offending rule by its
/// (one-based, for human readability) position in the rule file when known.
#[must_use]
pub fn config_error(rule_index: Option<usize>, message: impl std::fmt::Display) -> io::Error {
    let text = match rule_index {
        Some(index) => format!("rule #{}: {}", index + 1, message),
        None => message.to_string(),
    };
    io::Error::new(io::ErrorKind::InvalidData, text)
}
