//! Wire error types

use crate::message::{ArgumentKey, Operation};
use thiserror::Error;

/// Errors raised while building, encoding or decoding overlay messages.
///
/// [`WireError::MissingField`] and [`WireError::InvalidArgument`] are state
/// errors: the caller tried to finalise a message it had not fully built.
/// Every other variant describes malformed input received from a peer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Malformed wire text
    #[error("format error: {0}")]
    Format(String),

    /// Operation name not recognised
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// Search mode not recognised
    #[error("unknown search mode: {0}")]
    UnknownMode(String),

    /// Overlay address could not be parsed
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Argument count does not match the operation's positional schema
    #[error("{operation} expects {expected} arguments, got {actual}")]
    ArgumentCount {
        /// Operation being decoded
        operation: Operation,
        /// Arguments the operation carries
        expected: usize,
        /// Arguments present on the wire
        actual: usize,
    },

    /// Argument value rejected
    #[error("invalid argument {key}: {reason}")]
    InvalidArgument {
        /// Offending argument
        key: ArgumentKey,
        /// Why it was rejected
        reason: String,
    },

    /// Message finalised without a required field
    #[error("message is missing required field: {0}")]
    MissingField(&'static str),

    /// Frame exceeds the maximum message size
    #[error("message too large: {size} bytes (max {max})")]
    TooLarge {
        /// Received size
        size: usize,
        /// Allowed size
        max: usize,
    },
}

/// Result type for wire operations
pub type WireResult<T> = Result<T, WireError>;
