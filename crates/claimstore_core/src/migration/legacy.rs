//! Readers for the one-file-per-entity layout.
//!
//! ```text
//! ClaimData/<id>.yml          one YAML document per claim
//! ClaimData/_nextClaimID      bare integer
//! PlayerData/<uuid>           positional lines: _, accrued, bonus, ...
//! PlayerData/$<group>         first line: bonus
//! ```

use crate::world::WorldResolver;
use claimstore_codec::{ClaimRecord, Corner, Principal, NO_PARENT};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

const CLAIM_EXTENSION: &str = ".yml";
const GROUP_PREFIX: char = '$';

/// Why a legacy file could not be migrated.
#[derive(Debug, Error)]
pub enum LegacyError {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The claim document is not valid YAML of the expected shape.
    #[error("invalid claim document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A boundary corner key is absent.
    #[error("missing '{0}'")]
    MissingCorner(&'static str),

    /// A boundary corner is not `world;x;y;z`.
    #[error("invalid corner '{0}'")]
    InvalidCorner(String),

    /// The claim's world is not known to the host.
    #[error("world '{0}' not found")]
    UnknownWorld(String),

    /// A player file has fewer lines than the layout requires.
    #[error("expected at least {expected} lines, found {found}")]
    TooShort {
        /// Minimum line count.
        expected: usize,
        /// Actual line count.
        found: usize,
    },

    /// A count is not an integer.
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

/// A claim document as written by the legacy layout.
#[derive(Debug, Deserialize)]
struct LegacyClaimDocument {
    #[serde(rename = "Lesser Boundary Corner")]
    lesser: Option<String>,
    #[serde(rename = "Greater Boundary Corner")]
    greater: Option<String>,
    #[serde(rename = "Owner")]
    owner: Option<String>,
    #[serde(rename = "Parent Claim ID")]
    parent_id: Option<i64>,
    #[serde(rename = "inheritNothing")]
    inherit_nothing: Option<bool>,
    #[serde(rename = "Builders")]
    builders: Option<Vec<String>>,
    #[serde(rename = "Containers")]
    containers: Option<Vec<String>>,
    #[serde(rename = "Accessors")]
    accessors: Option<Vec<String>>,
    #[serde(rename = "Managers")]
    managers: Option<Vec<String>>,
}

/// Returns true for `*.yml` names that do not start with `_`.
pub fn is_claim_file_name(name: &str) -> bool {
    name.ends_with(CLAIM_EXTENSION) && !name.starts_with('_')
}

/// The claim id encoded in a claim file name, if numeric.
pub fn claim_id_from_file_name(name: &str) -> Option<u64> {
    name.strip_suffix(CLAIM_EXTENSION)?.parse().ok()
}

/// Returns true if `name` is exactly a lowercase hyphenated UUID.
pub fn is_player_file_name(name: &str) -> bool {
    if name.starts_with(GROUP_PREFIX) || name.starts_with('_') || name.ends_with(".ignore") {
        return false;
    }
    name.len() == 36
        && name.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_digit() || ('a'..='f').contains(&c),
        })
}

/// The group name of a `$<group>` file.
pub fn group_name_from_file_name(name: &str) -> Option<&str> {
    name.strip_prefix(GROUP_PREFIX)
}

/// Parses one claim document into a record in the host's spelling of its
/// world.
///
/// An owner that is not a UUID makes the claim administrative. Permission
/// entries that are not UUIDs are kept as nodes.
pub fn parse_claim_document<R: WorldResolver>(
    text: &str,
    id: u64,
    resolver: &R,
) -> Result<ClaimRecord, LegacyError> {
    let doc: LegacyClaimDocument = serde_yaml::from_str(text)?;

    let lesser = doc
        .lesser
        .ok_or(LegacyError::MissingCorner("Lesser Boundary Corner"))?;
    let greater = doc
        .greater
        .ok_or(LegacyError::MissingCorner("Greater Boundary Corner"))?;
    let (world, lesser) = parse_corner(&lesser)?;
    let (_, greater) = parse_corner(&greater)?;

    let world_name = resolver
        .match_world_name(&world)
        .ok_or(LegacyError::UnknownWorld(world))?;

    let principals = |list: Option<Vec<String>>| -> Vec<Principal> {
        list.unwrap_or_default()
            .iter()
            .map(|token| Principal::parse(token.trim()))
            .collect()
    };

    let mut record = ClaimRecord::new(id, world_name, lesser, greater);
    record.owner = doc
        .owner
        .as_deref()
        .map(str::trim)
        .filter(|owner| !owner.is_empty())
        .and_then(|owner| Uuid::try_parse(owner).ok());
    record.parent_id = doc.parent_id.unwrap_or(NO_PARENT);
    record.inherit_restrictions = doc.inherit_nothing.unwrap_or(false);
    record.builders = principals(doc.builders);
    record.containers = principals(doc.containers);
    record.accessors = principals(doc.accessors);
    record.managers = principals(doc.managers);
    Ok(record)
}

/// Reads and parses a `<id>.yml` file.
pub fn read_claim_file<R: WorldResolver>(
    path: &Path,
    id: u64,
    resolver: &R,
) -> Result<ClaimRecord, LegacyError> {
    parse_claim_document(&fs::read_to_string(path)?, id, resolver)
}

fn parse_corner(value: &str) -> Result<(String, Corner), LegacyError> {
    let parts: Vec<&str> = value.split(';').collect();
    if parts.len() < 4 {
        return Err(LegacyError::InvalidCorner(value.to_string()));
    }

    let coord = |s: &str| {
        s.trim()
            .parse::<i32>()
            .map_err(|_| LegacyError::InvalidCorner(value.to_string()))
    };
    let corner = Corner::new(coord(parts[1])?, coord(parts[2])?, coord(parts[3])?);
    Ok((parts[0].to_string(), corner))
}

/// Parses a player file: the second line is accrued blocks and the third
/// is bonus blocks.
pub fn parse_player_file(text: &str) -> Result<(i32, i32), LegacyError> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() < 3 {
        return Err(LegacyError::TooShort {
            expected: 3,
            found: lines.len(),
        });
    }
    Ok((parse_count(lines[1])?, parse_count(lines[2])?))
}

/// Parses a group file: the first line is the bonus. An empty file yields
/// `None`.
pub fn parse_group_file(text: &str) -> Result<Option<i32>, LegacyError> {
    text.lines().next().map(parse_count).transpose()
}

/// Parses the legacy counter file. Unreadable content yields `None`.
pub fn parse_next_id(text: &str) -> Option<u64> {
    text.trim().parse().ok()
}

fn parse_count(line: &str) -> Result<i32, LegacyError> {
    let line = line.trim();
    line.parse()
        .map_err(|_| LegacyError::InvalidNumber(line.to_string()))
}
