//! # claimstore codec
//!
//! Line-oriented encoding for claimstore data files.
//!
//! Each record occupies exactly one line. Fields are separated by `|`, there
//! is no quoting or escaping, and every file starts with a `V:<n>` header.
//! All functions in this crate are pure.
//!
//! ## Usage
//!
//! ```
//! use claimstore_codec::{decode_claim, encode_claim, ClaimRecord, Corner};
//!
//! let record = ClaimRecord::new(1, "world", Corner::new(0, 0, 0), Corner::new(15, 255, 15));
//! let line = encode_claim(&record);
//! assert_eq!(line, "1||0,0,0,15,255,15|-1|0|");
//! assert_eq!(decode_claim(&line, "world").unwrap(), record);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod claim;
mod compact;
mod error;
mod header;
mod player;

pub use claim::{
    decode_claim, encode_claim, ClaimRecord, Corner, Principal, Role, FIELD_SEP, ITEM_SEP,
    LIST_SEP, NO_PARENT, ROLE_SEP,
};
pub use compact::{decode_compact_uuid, encode_compact_uuid, COMPACT_UUID_LEN};
pub use error::{CodecError, CodecResult};
pub use header::{
    decode_header, encode_header, is_skippable, COMMENT_PREFIX, FORMAT_VERSION, HEADER_PREFIX,
};
pub use player::{
    decode_group, decode_player, encode_group, encode_player, GroupRecord, PlayerRecord,
};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn uuid_strategy() -> impl Strategy<Value = Uuid> {
        any::<u128>().prop_map(Uuid::from_u128)
    }

    fn principal_strategy() -> impl Strategy<Value = Principal> {
        prop_oneof![
            uuid_strategy().prop_map(Principal::Player),
            "\\[[a-z][a-z.]{0,15}\\]".prop_map(Principal::Node),
            "[g-z][a-z_]{0,11}".prop_map(Principal::Node),
        ]
    }

    fn corner_strategy() -> impl Strategy<Value = Corner> {
        (any::<i32>(), any::<i32>(), any::<i32>()).prop_map(|(x, y, z)| Corner::new(x, y, z))
    }

    fn permissions_strategy() -> impl Strategy<Value = Vec<Principal>> {
        prop::collection::vec(principal_strategy(), 0..4)
    }

    fn claim_strategy() -> impl Strategy<Value = ClaimRecord> {
        (
            any::<u64>(),
            prop::option::of(uuid_strategy()),
            corner_strategy(),
            corner_strategy(),
            -1i64..10_000,
            any::<bool>(),
            (
                permissions_strategy(),
                permissions_strategy(),
                permissions_strategy(),
                permissions_strategy(),
            ),
        )
            .prop_map(|(id, owner, lesser, greater, parent_id, flag, (b, c, a, m))| {
                ClaimRecord {
                    id,
                    owner,
                    world_name: "world".to_string(),
                    lesser,
                    greater,
                    parent_id,
                    inherit_restrictions: flag,
                    builders: b,
                    containers: c,
                    accessors: a,
                    managers: m,
                }
            })
    }

    proptest! {
        #[test]
        fn claim_roundtrip(record in claim_strategy()) {
            let line = encode_claim(&record);
            prop_assert!(!line.contains('\n'));
            prop_assert_eq!(decode_claim(&line, "world").unwrap(), record);
        }

        #[test]
        fn player_roundtrip(uuid in uuid_strategy(), accrued in any::<i32>(), bonus in any::<i32>()) {
            let record = PlayerRecord::new(uuid, accrued, bonus);
            prop_assert_eq!(decode_player(&encode_player(&record)).unwrap(), record);
        }

        #[test]
        fn group_roundtrip(name in "[A-Za-z0-9_.]{1,24}", bonus in any::<i32>()) {
            let record = GroupRecord::new(name, bonus);
            prop_assert_eq!(decode_group(&encode_group(&record)).unwrap(), record);
        }
    }
}
