//! Error values and result helpers for the extraction core.
//!
//! Every fallible operation in this crate returns a [`ParseResult`]. Failures
//! are plain values carrying a [`ParseErrorKind`] tag, a human-readable
//! message, and an optional context bag; nothing in the traversal or
//! extraction code panics on malformed input.
//!
//! The standard `Result` combinators cover mapping (`map`) and chaining
//! (`and_then`). [`combine`] folds a sequence of results into a single
//! all-or-first-error outcome.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Result type returned by every fallible traversal and extraction operation.
pub type ParseResult<T> = Result<T, ParseError>;

/// Closed set of failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParseErrorKind {
    /// The input is not an object, or an enumerated field holds an unknown value
    InvalidProps,
    /// A required field is absent
    MissingRequiredField,
    /// A field is present but has the wrong shape
    InvalidMessageFormat,
    /// A tree walk ended without a match
    TraversalFailed,
    /// The host structure no longer matches the stored fingerprint
    VersionMismatch,
    /// No UI tree could be reached from the host element
    FiberNotFound,
}

impl ParseErrorKind {
    /// Returns the wire identifier for this kind (e.g. `"invalid-props"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::InvalidProps => "invalid-props",
            ParseErrorKind::MissingRequiredField => "missing-required-field",
            ParseErrorKind::InvalidMessageFormat => "invalid-message-format",
            ParseErrorKind::TraversalFailed => "traversal-failed",
            ParseErrorKind::VersionMismatch => "version-mismatch",
            ParseErrorKind::FiberNotFound => "fiber-not-found",
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed, recoverable failure.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ParseError {
    /// Failure category
    pub kind: ParseErrorKind,

    /// Human-readable description
    pub message: String,

    /// Optional structured details (field names, depths, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

impl ParseError {
    /// Creates an error without context.
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
        }
    }

    /// Attaches one context entry, creating the context bag if needed.
    pub fn with_context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }

    pub fn invalid_props(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::InvalidProps, message)
    }

    /// Missing required field; the field name is recorded in the context.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ParseErrorKind::MissingRequiredField,
            format!("missing required field '{}'", field),
        )
        .with_context("field", field)
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::InvalidMessageFormat, message)
    }

    pub fn traversal_failed(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::TraversalFailed, message)
    }

    pub fn version_mismatch(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::VersionMismatch, message)
    }

    pub fn fiber_not_found(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::FiberNotFound, message)
    }
}

/// Combines a sequence of results: every value in order if all succeed,
/// otherwise the first error encountered.
///
/// # Example
///
/// ```
/// use fiber_extractor::result::{combine, ParseError, ParseResult};
///
/// let all: Vec<ParseResult<u32>> = vec![Ok(1), Ok(2)];
/// assert_eq!(combine(all).unwrap(), vec![1, 2]);
///
/// let mixed: Vec<ParseResult<u32>> = vec![
///     Ok(1),
///     Err(ParseError::invalid_props("first")),
///     Err(ParseError::invalid_props("second")),
/// ];
/// assert_eq!(combine(mixed).unwrap_err().message, "first");
/// ```
pub fn combine<T, I>(results: I) -> ParseResult<Vec<T>>
where
    I: IntoIterator<Item = ParseResult<T>>,
{
    results.into_iter().collect()
}

/// Convenience inspection helpers on [`ParseResult`].
pub trait ParseResultExt<T> {
    /// Returns the error kind for a failure, `None` for a success.
    fn error_kind(&self) -> Option<ParseErrorKind>;

    /// Logs a failure at debug level and converts to `Option`.
    fn ok_or_log(self, what: &str) -> Option<T>;
}

impl<T> ParseResultExt<T> for ParseResult<T> {
    fn error_kind(&self) -> Option<ParseErrorKind> {
        self.as_ref().err().map(|e| e.kind)
    }

    fn ok_or_log(self, what: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!("[EXTRACT] Skipping {}: {}", what, e);
                None
            }
        }
    }
}
