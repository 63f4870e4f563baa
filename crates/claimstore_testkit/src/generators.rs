//! Property-based test generators using proptest.
//!
//! Provides strategies for generating records that satisfy the store's
//! invariants.

use claimstore_codec::{ClaimRecord, Corner, GroupRecord, PlayerRecord, Principal, NO_PARENT};
use proptest::prelude::*;
use uuid::Uuid;

/// Strategy for generating UUIDs.
pub fn uuid_strategy() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

/// Strategy for generating world names, including ones that need
/// sanitizing.
pub fn world_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_ .-]{0,15}").expect("Invalid regex")
}

/// Strategy for generating permission node names.
pub fn node_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("\\[[a-z]{1,8}(\\.[a-z]{1,8}){0,2}\\]").expect("Invalid regex"),
        Just("public".to_string()),
    ]
}

/// Strategy for generating principals.
pub fn principal_strategy() -> impl Strategy<Value = Principal> {
    prop_oneof![
        uuid_strategy().prop_map(Principal::Player),
        node_strategy().prop_map(Principal::Node),
    ]
}

/// Strategy for generating a corner within world bounds.
pub fn corner_strategy() -> impl Strategy<Value = Corner> {
    (-30_000_000..30_000_000i32, -64..320i32, -30_000_000..30_000_000i32)
        .prop_map(|(x, y, z)| Corner::new(x, y, z))
}

/// Strategy for a list of principals for one role.
pub fn principals_strategy() -> impl Strategy<Value = Vec<Principal>> {
    prop::collection::vec(principal_strategy(), 0..4)
}

/// Strategy for generating claims in `world` with ids in `ids`.
pub fn claim_strategy(
    world: String,
    ids: std::ops::Range<u64>,
) -> impl Strategy<Value = ClaimRecord> {
    (
        ids,
        prop::option::of(uuid_strategy()),
        corner_strategy(),
        corner_strategy(),
        prop::option::of(0..1_000i64),
        any::<bool>(),
        (
            principals_strategy(),
            principals_strategy(),
            principals_strategy(),
            principals_strategy(),
        ),
    )
        .prop_map(
            move |(id, owner, lesser, greater, parent, inherit, (b, c, a, m))| ClaimRecord {
                id,
                owner,
                world_name: world.clone(),
                lesser,
                greater,
                parent_id: parent.unwrap_or(NO_PARENT),
                inherit_restrictions: inherit,
                builders: b,
                containers: c,
                accessors: a,
                managers: m,
            },
        )
}

/// Strategy for generating players. Both counters may be zero.
pub fn player_strategy() -> impl Strategy<Value = PlayerRecord> {
    (uuid_strategy(), 0..100_000i32, 0..100_000i32)
        .prop_map(|(uuid, accrued, bonus)| PlayerRecord::new(uuid, accrued, bonus))
}

/// Strategy for generating groups with a non-zero bonus.
pub fn group_strategy() -> impl Strategy<Value = GroupRecord> {
    (
        prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_.]{0,15}").expect("Invalid regex"),
        (1..10_000i32).prop_union(-10_000..-1i32),
    )
        .prop_map(|(name, bonus)| GroupRecord::new(name, bonus))
}
