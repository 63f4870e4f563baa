//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while decoding a record line.
///
/// Every variant describes a structural problem with a single line. Callers
/// loading a whole file treat these as recoverable: the line is logged and
/// skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The line has fewer fields than the record requires.
    #[error("not enough fields: expected at least {expected}, found {found}")]
    MissingFields {
        /// Minimum number of fields for the record kind.
        expected: usize,
        /// Number of fields actually present.
        found: usize,
    },

    /// A numeric field could not be parsed.
    #[error("invalid integer in field '{field}': {value:?}")]
    InvalidInteger {
        /// Name of the offending field.
        field: &'static str,
        /// The raw text of the field.
        value: String,
    },

    /// A UUID field is neither hyphenated nor 32 hex digits.
    #[error("invalid compact UUID: {value:?}")]
    InvalidUuid {
        /// The raw text of the field.
        value: String,
    },

    /// The bounding box field is not six comma-separated integers.
    #[error("invalid coordinates: {value:?}")]
    InvalidCoordinates {
        /// The raw text of the field.
        value: String,
    },

    /// The version header line is missing or garbled.
    #[error("invalid version header: {line:?}")]
    InvalidHeader {
        /// The offending first line.
        line: String,
    },
}

impl CodecError {
    /// Create an invalid integer error.
    pub fn invalid_integer(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidInteger {
            field,
            value: value.into(),
        }
    }

    /// Create an invalid UUID error.
    pub fn invalid_uuid(value: impl Into<String>) -> Self {
        Self::InvalidUuid {
            value: value.into(),
        }
    }

    /// Create an invalid coordinates error.
    pub fn invalid_coordinates(value: impl Into<String>) -> Self {
        Self::InvalidCoordinates {
            value: value.into(),
        }
    }

    /// Create an invalid header error.
    pub fn invalid_header(line: impl Into<String>) -> Self {
        Self::InvalidHeader { line: line.into() }
    }
}
