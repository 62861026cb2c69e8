//! Error types for codec operations.
//!
//! This module provides the [`CodecError`] type for all harness operations
//! and the [`Result`] convenience type.

use crate::formats::Format;
use thiserror::Error;

/// Error type for all codec and harness operations.
///
/// Nothing in the crate retries; the first error surfaces to the caller,
/// which decides whether the run terminates.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The batch does not conform to the binary schema.
    ///
    /// Detected before any bytes are produced.
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// Input bytes cannot be decoded into a batch for the given format.
    #[error("Malformed {format} input: {message}")]
    MalformedInput {
        /// Format whose decoder rejected the input
        format: Format,
        /// What was wrong with the input
        message: String,
    },

    /// The batch cannot be written in the given format.
    ///
    /// Raised by the text encoders if the serializer rejects a value; the
    /// binary encoder reports [`CodecError::SchemaViolation`] instead.
    #[error("Cannot encode batch as {format}: {message}")]
    Unrepresentable {
        /// Format whose encoder failed
        format: Format,
        /// Serializer message
        message: String,
    },

    /// The schema text could not be parsed or lacks the expected types.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// The harness configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A decoded batch differs from the batch that was encoded.
    #[error("{format} round trip changed record {index}")]
    RoundTripMismatch {
        /// Format whose round trip failed
        format: Format,
        /// Index of the first differing record (or the shorter length)
        index: usize,
    },

    /// IO error from artifact, schema or configuration files.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CodecError {
    /// Build a [`CodecError::MalformedInput`] for `format`.
    pub(crate) fn malformed(format: Format, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            format,
            message: message.into(),
        }
    }
}

/// Convenience type alias for [`std::result::Result`] with [`CodecError`].
pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display_names_format() {
        let err = CodecError::malformed(Format::Xml, "unexpected end of document");
        assert_eq!(
            err.to_string(),
            "Malformed XML input: unexpected end of document"
        );
    }

    #[test]
    fn test_unrepresentable_display_names_format() {
        let err = CodecError::Unrepresentable {
            format: Format::Json,
            message: "key must be a string".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot encode batch as JSON: key must be a string"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CodecError = io.into();
        assert!(matches!(err, CodecError::IoError(_)));
    }
}
