//! Player and group record encoding.
//!
//! ```text
//! <compactUUID>|<accrued>|<bonus>
//! <groupName>|<bonus>
//! ```

use crate::claim::FIELD_SEP;
use crate::compact::{decode_compact_uuid, encode_compact_uuid};
use crate::error::{CodecError, CodecResult};
use uuid::Uuid;

/// Claim-block accounting for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerRecord {
    /// The player.
    pub uuid: Uuid,
    /// Blocks earned through play time.
    pub accrued_blocks: i32,
    /// Blocks granted by staff or purchase.
    pub bonus_blocks: i32,
}

impl PlayerRecord {
    /// Creates a player record.
    #[must_use]
    pub const fn new(uuid: Uuid, accrued_blocks: i32, bonus_blocks: i32) -> Self {
        Self {
            uuid,
            accrued_blocks,
            bonus_blocks,
        }
    }

    /// A record with both counters at zero carries no information and is
    /// never persisted.
    #[must_use]
    pub const fn is_default(&self) -> bool {
        self.accrued_blocks == 0 && self.bonus_blocks == 0
    }
}

/// Bonus blocks granted to every member of a permission group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupRecord {
    /// Group (permission) name.
    pub name: String,
    /// Bonus blocks for the group.
    pub bonus_blocks: i32,
}

impl GroupRecord {
    /// Creates a group record.
    #[must_use]
    pub fn new(name: impl Into<String>, bonus_blocks: i32) -> Self {
        Self {
            name: name.into(),
            bonus_blocks,
        }
    }
}

/// Encodes a player record as a single line.
#[must_use]
pub fn encode_player(record: &PlayerRecord) -> String {
    format!(
        "{}{FIELD_SEP}{}{FIELD_SEP}{}",
        encode_compact_uuid(&record.uuid),
        record.accrued_blocks,
        record.bonus_blocks
    )
}

/// Decodes a player line.
///
/// # Errors
///
/// Returns an error if there are fewer than three fields or any field is
/// malformed.
pub fn decode_player(line: &str) -> CodecResult<PlayerRecord> {
    let fields: Vec<&str> = line.split(FIELD_SEP).collect();
    if fields.len() < 3 {
        return Err(CodecError::MissingFields {
            expected: 3,
            found: fields.len(),
        });
    }

    Ok(PlayerRecord {
        uuid: decode_compact_uuid(fields[0])?,
        accrued_blocks: parse_i32("accrued", fields[1])?,
        bonus_blocks: parse_i32("bonus", fields[2])?,
    })
}

/// Encodes a group record as a single line.
#[must_use]
pub fn encode_group(record: &GroupRecord) -> String {
    format!("{}{FIELD_SEP}{}", record.name, record.bonus_blocks)
}

/// Decodes a group line.
///
/// # Errors
///
/// Returns an error if there are fewer than two fields or the bonus is not
/// an integer.
pub fn decode_group(line: &str) -> CodecResult<GroupRecord> {
    let fields: Vec<&str> = line.split(FIELD_SEP).collect();
    if fields.len() < 2 {
        return Err(CodecError::MissingFields {
            expected: 2,
            found: fields.len(),
        });
    }

    Ok(GroupRecord {
        name: fields[0].to_string(),
        bonus_blocks: parse_i32("bonus", fields[1])?,
    })
}

fn parse_i32(field: &'static str, value: &str) -> CodecResult<i32> {
    value
        .parse::<i32>()
        .map_err(|_| CodecError::invalid_integer(field, value))
}
