//! File header and line classification.
//!
//! Every data file starts with a `V:<n>` line. Readers refuse files whose
//! version is newer than [`FORMAT_VERSION`].

use crate::error::{CodecError, CodecResult};

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Prefix of the version header line.
pub const HEADER_PREFIX: &str = "V:";

/// Prefix of a comment line.
pub const COMMENT_PREFIX: char = '#';

/// Formats a version header line (without the trailing newline).
#[must_use]
pub fn encode_header(version: u32) -> String {
    format!("{HEADER_PREFIX}{version}")
}

/// Parses the version number from a header line.
///
/// # Errors
///
/// Returns [`CodecError::InvalidHeader`] if the line does not start with
/// `V:` followed by an unsigned integer.
pub fn decode_header(line: &str) -> CodecResult<u32> {
    line.strip_prefix(HEADER_PREFIX)
        .and_then(|rest| rest.trim().parse::<u32>().ok())
        .ok_or_else(|| CodecError::invalid_header(line))
}

/// Returns true for blank lines and `#` comments, which every reader ignores.
#[must_use]
pub fn is_skippable(line: &str) -> bool {
    line.is_empty() || line.starts_with(COMMENT_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        assert_eq!(encode_header(FORMAT_VERSION), "V:1");
        assert_eq!(decode_header("V:1").unwrap(), 1);
        assert_eq!(decode_header("V:42").unwrap(), 42);
    }

    #[test]
    fn header_rejects_garbage() {
        assert!(decode_header("").is_err());
        assert!(decode_header("1").is_err());
        assert!(decode_header("V:").is_err());
        assert!(decode_header("V:one").is_err());
        assert!(decode_header("v:1").is_err());
    }

    #[test]
    fn skippable_lines() {
        assert!(is_skippable(""));
        assert!(is_skippable("# written by hand"));
        assert!(!is_skippable("1||0,0,0,1,1,1|-1|0|"));
        assert!(!is_skippable(" "));
    }
}
