//! Shared error definitions for the state model.

use thiserror::Error;

/// Result alias used throughout the state model.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding state model values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The supplied duration string is not a valid protobuf JSON duration.
    #[error("invalid duration `{value}`: {reason}")]
    InvalidDuration {
        /// The offending duration string.
        value: String,
        /// Human-readable reason for rejection.
        reason: &'static str,
    },
}

impl Error {
    pub(crate) fn invalid_duration(value: &str, reason: &'static str) -> Self {
        Self::InvalidDuration {
            value: value.to_owned(),
            reason,
        }
    }
}
