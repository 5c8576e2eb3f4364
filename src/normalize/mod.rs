//! Model-output normalization.
//!
//! Generated text goes through three steps:
//!
//! 1. [`parse`]: strict parse, `RESPONSE:` block extraction, then
//!    [`repair`] and a final strict parse. Text that still fails becomes an
//!    `{error, raw_text}` object.
//! 2. [`ParsedModelOutput::classify`]: the parsed value is sorted once into
//!    an error, a single object, a sequence, or nothing usable.
//! 3. [`validate`]: the classified value is coerced into the shape the
//!    requested tab promises.
//!
//! Fallback payloads (used when no live model is configured) live in
//! [`crate::fallback`].

use serde_json::{Map, Value};

pub mod parse;
pub mod repair;
pub mod validate;

pub use parse::{ParseFailure, parse_model_text};
pub use validate::validate;

/// A parsed model payload, classified once at the parse boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedModelOutput {
    /// Upstream or parse failure, carried verbatim.
    Error(Map<String, Value>),
    /// A single object (the monthly shape, or a lone daily/weekly item).
    Single(Map<String, Value>),
    /// A list (the daily/weekly shape).
    Sequence(Vec<Value>),
    /// Null, a string, a number or a boolean.
    Empty,
}

impl ParsedModelOutput {
    /// Classify `value`, unwrapping the `expected_key` wrapper if present.
    ///
    /// Any object with an `error` member is an error, wrapped or not.
    pub fn classify(value: Value, expected_key: &str) -> Self {
        match value {
            Value::Object(mut map) => {
                if map.contains_key("error") {
                    ParsedModelOutput::Error(map)
                } else if let Some(inner) = map.remove(expected_key) {
                    Self::classify(inner, expected_key)
                } else {
                    ParsedModelOutput::Single(map)
                }
            }
            Value::Array(items) => ParsedModelOutput::Sequence(items),
            _ => ParsedModelOutput::Empty,
        }
    }

    /// Label recorded as `_metadata.model_output_type`.
    pub fn kind(&self) -> &'static str {
        match self {
            ParsedModelOutput::Error(_) => "error",
            ParsedModelOutput::Single(_) => "object",
            ParsedModelOutput::Sequence(_) => "array",
            ParsedModelOutput::Empty => "empty",
        }
    }
}

impl From<ParseFailure> for ParsedModelOutput {
    fn from(failure: ParseFailure) -> Self {
        ParsedModelOutput::Error(failure.to_payload())
    }
}

/// Parse and classify raw generated text.
pub fn parse_model_output(text: &str, expected_key: &str) -> ParsedModelOutput {
    match parse_model_text(text) {
        Ok(value) => ParsedModelOutput::classify(value, expected_key),
        Err(failure) => failure.into(),
    }
}
