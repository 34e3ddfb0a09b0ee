//! Error types for data parsing in shield-types.

use thiserror::Error;

/// Errors that can occur when parsing dashboard wire data.
///
/// This error type is transport-agnostic; request and channel errors
/// belong in shield-net.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A timestamp field could not be interpreted.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// An event payload was missing required fields or had the wrong shape.
    #[error("Malformed event payload: {0}")]
    MalformedEvent(String),

    /// The event name is not one this pipeline understands.
    #[error("Unknown event: {0}")]
    UnknownEvent(String),
}

/// Result type alias using shield-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
