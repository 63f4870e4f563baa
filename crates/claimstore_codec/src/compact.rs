//! Compact UUID representation.
//!
//! On disk a UUID is written as its 32 lowercase hex digits with the hyphens
//! stripped. The decoder also accepts the canonical hyphenated form so files
//! edited by hand keep loading.

use crate::error::{CodecError, CodecResult};
use uuid::Uuid;

/// Length of the hyphen-less form.
pub const COMPACT_UUID_LEN: usize = 32;

/// Length of the canonical hyphenated form.
const HYPHENATED_UUID_LEN: usize = 36;

/// Formats a UUID as 32 lowercase hex digits.
#[must_use]
pub fn encode_compact_uuid(uuid: &Uuid) -> String {
    uuid.simple().to_string()
}

/// Parses a UUID in either compact or hyphenated form.
///
/// # Errors
///
/// Returns [`CodecError::InvalidUuid`] if a hyphen-less token is not exactly
/// 32 hex characters, or a hyphenated token is not a canonical UUID.
pub fn decode_compact_uuid(token: &str) -> CodecResult<Uuid> {
    let well_formed = if token.contains('-') {
        token.len() == HYPHENATED_UUID_LEN
    } else {
        token.len() == COMPACT_UUID_LEN && token.bytes().all(|b| b.is_ascii_hexdigit())
    };

    if !well_formed {
        return Err(CodecError::invalid_uuid(token));
    }

    Uuid::try_parse(token).map_err(|_| CodecError::invalid_uuid(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HYPHENATED: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";
    const COMPACT: &str = "0f8fad5bd9cb469fa16570867728950e";

    #[test]
    fn encode_strips_hyphens() {
        let uuid = Uuid::parse_str(HYPHENATED).unwrap();
        assert_eq!(encode_compact_uuid(&uuid), COMPACT);
    }

    #[test]
    fn decode_accepts_both_forms() {
        let a = decode_compact_uuid(COMPACT).unwrap();
        let b = decode_compact_uuid(HYPHENATED).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn decode_accepts_uppercase() {
        let upper = COMPACT.to_ascii_uppercase();
        assert_eq!(
            decode_compact_uuid(&upper).unwrap(),
            decode_compact_uuid(COMPACT).unwrap()
        );
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert!(decode_compact_uuid("abcd1234").is_err());
        assert!(decode_compact_uuid(&format!("{COMPACT}0")).is_err());
        assert!(decode_compact_uuid("").is_err());
    }

    #[test]
    fn decode_rejects_non_hex() {
        let bad = "zf8fad5bd9cb469fa16570867728950e";
        assert!(matches!(
            decode_compact_uuid(bad),
            Err(CodecError::InvalidUuid { .. })
        ));
    }

    #[test]
    fn decode_rejects_braced_and_urn_forms() {
        assert!(decode_compact_uuid(&format!("{{{HYPHENATED}}}")).is_err());
        assert!(decode_compact_uuid(&format!("urn:uuid:{HYPHENATED}")).is_err());
    }
}
