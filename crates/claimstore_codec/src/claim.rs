//! Claim record encoding.
//!
//! ```text
//! <id>|<owner>|<x1>,<y1>,<z1>,<x2>,<y2>,<z2>|<parent>|<0|1>|<permissions>
//! ```
//!
//! The permission block is a `;`-joined list of `<role>:<id>,<id>` groups in
//! the fixed role order Build, Container, Access, Manage. Roles with no
//! entries are omitted.
//!
//! There is no quoting. Identifiers and world names must never contain `|`,
//! `;` or `,`.

use crate::compact::{decode_compact_uuid, encode_compact_uuid};
use crate::error::{CodecError, CodecResult};
use std::borrow::Cow;
use std::fmt;
use uuid::Uuid;

/// Separator between top-level fields.
pub const FIELD_SEP: char = '|';
/// Separator between role groups in the permission block.
pub const LIST_SEP: char = ';';
/// Separator between a role code and its identifiers.
pub const ROLE_SEP: char = ':';
/// Separator between identifiers and between coordinates.
pub const ITEM_SEP: char = ',';

/// Minimum number of fields on a claim line.
const MIN_CLAIM_FIELDS: usize = 5;

/// Parent id of a top-level claim.
pub const NO_PARENT: i64 = -1;

/// A block position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Corner {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl Corner {
    /// Creates a corner from coordinates.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Permission roles, in serialization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// May build and break blocks.
    Build,
    /// May open containers.
    Container,
    /// May use doors, buttons and the like.
    Access,
    /// May grant permissions to others.
    Manage,
}

impl Role {
    /// All roles in the order they are written.
    pub const ALL: [Role; 4] = [Role::Build, Role::Container, Role::Access, Role::Manage];

    /// Single-letter code used in the permission block.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Role::Build => 'B',
            Role::Container => 'C',
            Role::Access => 'A',
            Role::Manage => 'M',
        }
    }

    /// Looks up a role by its code.
    #[must_use]
    pub const fn from_code(code: char) -> Option<Self> {
        match code {
            'B' => Some(Role::Build),
            'C' => Some(Role::Container),
            'A' => Some(Role::Access),
            'M' => Some(Role::Manage),
            _ => None,
        }
    }
}

/// An entry in a permission list: a player or an opaque permission node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Principal {
    /// A player identified by UUID.
    Player(Uuid),
    /// Anything that is not a UUID, e.g. `[worldedit.bypass]` or `public`.
    Node(String),
}

impl Principal {
    /// Classifies a raw identifier.
    ///
    /// Tokens starting with `[` are always nodes. Other tokens become players
    /// when they parse as a UUID (compact or hyphenated) and nodes otherwise.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        if token.starts_with('[') {
            return Self::Node(token.to_string());
        }
        match decode_compact_uuid(token) {
            Ok(uuid) => Self::Player(uuid),
            Err(_) => Self::Node(token.to_string()),
        }
    }

    /// The on-disk form of this identifier.
    #[must_use]
    pub fn encode(&self) -> Cow<'_, str> {
        match self {
            Self::Player(uuid) => Cow::Owned(encode_compact_uuid(uuid)),
            Self::Node(node) => Cow::Borrowed(node),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player(uuid) => write!(f, "{uuid}"),
            Self::Node(node) => f.write_str(node),
        }
    }
}

impl From<Uuid> for Principal {
    fn from(uuid: Uuid) -> Self {
        Self::Player(uuid)
    }
}

/// Flat projection of a claim or sub-claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRecord {
    /// Globally unique claim id.
    pub id: u64,
    /// Owner, or `None` for an administrative claim.
    pub owner: Option<Uuid>,
    /// Name of the world the claim lives in.
    pub world_name: String,
    /// Lesser boundary corner.
    pub lesser: Corner,
    /// Greater boundary corner.
    pub greater: Corner,
    /// Parent claim id, or [`NO_PARENT`].
    pub parent_id: i64,
    /// Whether a sub-claim ignores its parent's permissions.
    pub inherit_restrictions: bool,
    /// Principals with build trust.
    pub builders: Vec<Principal>,
    /// Principals with container trust.
    pub containers: Vec<Principal>,
    /// Principals with access trust.
    pub accessors: Vec<Principal>,
    /// Principals who may manage permissions.
    pub managers: Vec<Principal>,
}

impl ClaimRecord {
    /// Creates a top-level administrative claim with empty permission lists.
    #[must_use]
    pub fn new(id: u64, world_name: impl Into<String>, lesser: Corner, greater: Corner) -> Self {
        Self {
            id,
            owner: None,
            world_name: world_name.into(),
            lesser,
            greater,
            parent_id: NO_PARENT,
            inherit_restrictions: false,
            builders: Vec::new(),
            containers: Vec::new(),
            accessors: Vec::new(),
            managers: Vec::new(),
        }
    }

    /// Sets the owner.
    #[must_use]
    pub fn with_owner(mut self, owner: Uuid) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Makes this a sub-claim of `parent`.
    #[must_use]
    pub fn with_parent(mut self, parent: u64) -> Self {
        self.parent_id = i64::try_from(parent).unwrap_or(i64::MAX);
        self
    }

    /// Appends a principal to a role's list.
    #[must_use]
    pub fn with_permission(mut self, role: Role, principal: impl Into<Principal>) -> Self {
        self.permissions_mut(role).push(principal.into());
        self
    }

    /// Returns true if this record has no parent.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.parent_id < 0
    }

    /// The parent id, if any.
    #[must_use]
    pub fn parent(&self) -> Option<u64> {
        u64::try_from(self.parent_id).ok()
    }

    /// Returns true for administrative claims.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.owner.is_none()
    }

    /// The principal list for a role.
    #[must_use]
    pub fn permissions(&self, role: Role) -> &[Principal] {
        match role {
            Role::Build => &self.builders,
            Role::Container => &self.containers,
            Role::Access => &self.accessors,
            Role::Manage => &self.managers,
        }
    }

    /// Mutable principal list for a role.
    pub fn permissions_mut(&mut self, role: Role) -> &mut Vec<Principal> {
        match role {
            Role::Build => &mut self.builders,
            Role::Container => &mut self.containers,
            Role::Access => &mut self.accessors,
            Role::Manage => &mut self.managers,
        }
    }
}

/// Encodes a claim record as a single line (without the trailing newline).
#[must_use]
pub fn encode_claim(record: &ClaimRecord) -> String {
    let owner = record
        .owner
        .as_ref()
        .map(encode_compact_uuid)
        .unwrap_or_default();
    let (l, g) = (record.lesser, record.greater);

    format!(
        "{id}{s}{owner}{s}{},{},{},{},{},{}{s}{parent}{s}{flag}{s}{perms}",
        l.x,
        l.y,
        l.z,
        g.x,
        g.y,
        g.z,
        id = record.id,
        s = FIELD_SEP,
        parent = record.parent_id,
        flag = if record.inherit_restrictions { '1' } else { '0' },
        perms = encode_permissions(record),
    )
}

fn encode_permissions(record: &ClaimRecord) -> String {
    let groups: Vec<String> = Role::ALL
        .iter()
        .filter(|role| !record.permissions(**role).is_empty())
        .map(|&role| {
            let ids: Vec<Cow<'_, str>> = record
                .permissions(role)
                .iter()
                .map(Principal::encode)
                .collect();
            format!("{}{ROLE_SEP}{}", role.code(), ids.join(","))
        })
        .collect();

    groups.join(";")
}

/// Decodes a claim line belonging to `world_name`.
///
/// # Errors
///
/// Returns an error if the line has fewer than five fields, or if the id,
/// owner, coordinates or parent id fields are malformed. Malformed UUIDs
/// inside the permission block are not errors; they are kept as
/// [`Principal::Node`].
pub fn decode_claim(line: &str, world_name: &str) -> CodecResult<ClaimRecord> {
    let fields: Vec<&str> = line.split(FIELD_SEP).collect();
    if fields.len() < MIN_CLAIM_FIELDS {
        return Err(CodecError::MissingFields {
            expected: MIN_CLAIM_FIELDS,
            found: fields.len(),
        });
    }

    let id = fields[0]
        .parse::<u64>()
        .map_err(|_| CodecError::invalid_integer("id", fields[0]))?;

    let owner = if fields[1].is_empty() {
        None
    } else {
        Some(decode_compact_uuid(fields[1])?)
    };

    let (lesser, greater) = decode_box(fields[2])?;

    let parent_id = fields[3]
        .parse::<i64>()
        .map_err(|_| CodecError::invalid_integer("parent", fields[3]))?;

    let inherit_restrictions = fields[4] == "1" || fields[4].eq_ignore_ascii_case("true");

    let mut record = ClaimRecord {
        id,
        owner,
        world_name: world_name.to_string(),
        lesser,
        greater,
        parent_id,
        inherit_restrictions,
        builders: Vec::new(),
        containers: Vec::new(),
        accessors: Vec::new(),
        managers: Vec::new(),
    };

    if let Some(block) = fields.get(5).filter(|block| !block.is_empty()) {
        decode_permissions(block, &mut record);
    }

    Ok(record)
}

fn decode_box(field: &str) -> CodecResult<(Corner, Corner)> {
    let coords: Vec<i32> = field
        .split(ITEM_SEP)
        .map(str::parse::<i32>)
        .collect::<Result<_, _>>()
        .map_err(|_| CodecError::invalid_coordinates(field))?;

    match coords[..] {
        [x1, y1, z1, x2, y2, z2] => Ok((Corner::new(x1, y1, z1), Corner::new(x2, y2, z2))),
        _ => Err(CodecError::invalid_coordinates(field)),
    }
}

fn decode_permissions(block: &str, record: &mut ClaimRecord) {
    for group in block.split(LIST_SEP) {
        let mut chars = group.chars();
        let (Some(code), Some(ROLE_SEP)) = (chars.next(), chars.next()) else {
            continue;
        };
        let Some(role) = Role::from_code(code) else {
            continue;
        };

        let list = record.permissions_mut(role);
        for token in chars.as_str().split(ITEM_SEP).filter(|t| !t.is_empty()) {
            list.push(Principal::parse(token));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "0f8fad5bd9cb469fa16570867728950e";
    const FRIEND: &str = "7c9e6679742540de944be07fc1f90ae7";

    fn uuid(s: &str) -> Uuid {
        decode_compact_uuid(s).unwrap()
    }

    #[test]
    fn encode_full_record() {
        let record = ClaimRecord::new(12, "world", Corner::new(-10, 0, -10), Corner::new(10, 255, 10))
            .with_owner(uuid(OWNER))
            .with_permission(Role::Build, uuid(FRIEND))
            .with_permission(Role::Manage, Principal::Node("[mod.perm]".into()));

        assert_eq!(
            encode_claim(&record),
            format!("12|{OWNER}|-10,0,-10,10,255,10|-1|0|B:{FRIEND};M:[mod.perm]")
        );
    }

    #[test]
    fn encode_admin_claim_has_empty_owner_and_block() {
        let record = ClaimRecord::new(3, "nether", Corner::new(0, 0, 0), Corner::new(1, 1, 1));
        assert_eq!(encode_claim(&record), "3||0,0,0,1,1,1|-1|0|");
    }

    #[test]
    fn encode_subclaim_flag() {
        let mut record = ClaimRecord::new(9, "w", Corner::default(), Corner::default()).with_parent(4);
        record.inherit_restrictions = true;
        assert_eq!(encode_claim(&record), "9||0,0,0,0,0,0|4|1|");
    }

    #[test]
    fn decode_admin_claim_with_empty_owner() {
        let record = decode_claim("5||1,2,3,4,5,6|-1|0|", "world").unwrap();
        assert_eq!(record.id, 5);
        assert_eq!(record.owner, None);
        assert!(record.is_admin());
        assert!(record.is_top_level());
        assert_eq!(record.lesser, Corner::new(1, 2, 3));
        assert_eq!(record.greater, Corner::new(4, 5, 6));
        assert_eq!(record.world_name, "world");
    }

    #[test]
    fn decode_mixed_uuid_and_node_permissions() {
        let line = format!("7|{OWNER}|0,0,0,1,1,1|-1|0|B:{FRIEND};C:[worldedit.bypass]");
        let record = decode_claim(&line, "world").unwrap();

        assert_eq!(record.builders, vec![Principal::Player(uuid(FRIEND))]);
        assert_eq!(
            record.containers,
            vec![Principal::Node("[worldedit.bypass]".into())]
        );
        assert!(record.accessors.is_empty());
        assert!(record.managers.is_empty());
    }

    #[test]
    fn decode_without_permission_field() {
        let record = decode_claim("1||0,0,0,1,1,1|-1|1", "w").unwrap();
        assert!(record.inherit_restrictions);
        assert!(record.builders.is_empty());
    }

    #[test]
    fn decode_accepts_true_flag() {
        let record = decode_claim("1||0,0,0,1,1,1|2|TRUE|", "w").unwrap();
        assert!(record.inherit_restrictions);
        assert_eq!(record.parent(), Some(2));
    }

    #[test]
    fn decode_keeps_malformed_uuid_as_node() {
        let record = decode_claim("1||0,0,0,1,1,1|-1|0|A:abcd1234,public", "w").unwrap();
        assert_eq!(
            record.accessors,
            vec![
                Principal::Node("abcd1234".into()),
                Principal::Node("public".into())
            ]
        );
    }

    #[test]
    fn decode_accepts_hyphenated_tokens() {
        let line = "1|0f8fad5b-d9cb-469f-a165-70867728950e|0,0,0,1,1,1|-1|0|B:7c9e6679-7425-40de-944b-e07fc1f90ae7";
        let record = decode_claim(line, "w").unwrap();
        assert_eq!(record.owner, Some(uuid(OWNER)));
        assert_eq!(record.builders, vec![Principal::Player(uuid(FRIEND))]);
    }

    #[test]
    fn decode_ignores_unknown_and_malformed_groups() {
        let record = decode_claim("1||0,0,0,1,1,1|-1|0|X:foo;B;Bfoo;M:bar", "w").unwrap();
        assert!(record.builders.is_empty());
        assert_eq!(record.managers, vec![Principal::Node("bar".into())]);
    }

    #[test]
    fn decode_bracket_token_never_parsed_as_uuid() {
        let line = format!("1||0,0,0,1,1,1|-1|0|B:[{OWNER}]");
        let record = decode_claim(&line, "w").unwrap();
        assert_eq!(record.builders, vec![Principal::Node(format!("[{OWNER}]"))]);
    }

    #[test]
    fn decode_rejects_too_few_fields() {
        assert_eq!(
            decode_claim("1||0,0,0,1,1,1|-1", "w"),
            Err(CodecError::MissingFields {
                expected: 5,
                found: 4
            })
        );
    }

    #[test]
    fn decode_rejects_bad_fields() {
        assert!(matches!(
            decode_claim("x||0,0,0,1,1,1|-1|0", "w"),
            Err(CodecError::InvalidInteger { field: "id", .. })
        ));
        assert!(matches!(
            decode_claim("1|nope|0,0,0,1,1,1|-1|0", "w"),
            Err(CodecError::InvalidUuid { .. })
        ));
        assert!(matches!(
            decode_claim("1||0,0,0,1,1|-1|0", "w"),
            Err(CodecError::InvalidCoordinates { .. })
        ));
        assert!(matches!(
            decode_claim("1||0,0,0,1,1,a|-1|0", "w"),
            Err(CodecError::InvalidCoordinates { .. })
        ));
        assert!(matches!(
            decode_claim("1||0,0,0,1,1,1|top|0", "w"),
            Err(CodecError::InvalidInteger {
                field: "parent",
                ..
            })
        ));
    }

    #[test]
    fn principal_classification() {
        assert_eq!(Principal::parse(OWNER), Principal::Player(uuid(OWNER)));
        assert_eq!(
            Principal::parse("[perm]"),
            Principal::Node("[perm]".into())
        );
        assert_eq!(Principal::parse("public"), Principal::Node("public".into()));
        assert_eq!(Principal::Player(uuid(OWNER)).encode(), OWNER);
    }

    #[test]
    fn role_codes_roundtrip() {
        for role in Role::ALL {
            assert_eq!(Role::from_code(role.code()), Some(role));
        }
        assert_eq!(Role::from_code('Z'), None);
    }
}
