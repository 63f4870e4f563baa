//! Resolving stored claims into the host's live claim tree.

use super::ClaimStore;
use crate::error::CoreError;
use crate::world::WorldResolver;
use claimstore_codec::ClaimRecord;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// A claim whose world resolved, with its sub-claims.
#[derive(Debug, Clone)]
pub struct ClaimNode<H> {
    /// The stored record.
    pub record: ClaimRecord,
    /// The host's handle for the record's world.
    pub world: H,
    /// Sub-claims, sorted by id.
    pub children: Vec<ClaimNode<H>>,
}

impl<H> ClaimNode<H> {
    /// The claim id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.record.id
    }

    /// Number of claims in this subtree, including this one.
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(ClaimNode::subtree_len).sum::<usize>()
    }

    fn find(&self, id: u64) -> Option<&ClaimNode<H>> {
        if self.record.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// The set of claims the host should treat as live.
#[derive(Debug)]
pub struct ActiveClaims<H> {
    /// Top-level claims, sorted by id.
    pub roots: Vec<ClaimNode<H>>,
    /// Claims left out because their world could not be resolved.
    pub unresolved: Vec<CoreError>,
    /// Claims whose parent is not active; they are kept as top-level.
    pub orphans: Vec<u64>,
}

impl<H> ActiveClaims<H> {
    /// Total number of active claims, sub-claims included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.iter().map(ClaimNode::subtree_len).sum()
    }

    /// Returns true if no claim is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Finds an active claim by id.
    #[must_use]
    pub fn find(&self, id: u64) -> Option<&ClaimNode<H>> {
        self.roots.iter().find_map(|root| root.find(id))
    }
}

impl ClaimStore {
    /// Builds the active claim tree.
    ///
    /// Every record's world is resolved through `resolver`. Records in
    /// unknown worlds are reported and left out, but stay in memory and on
    /// disk. Sub-claims are then attached to their parents; a record whose
    /// parent is not active becomes top-level.
    pub fn resolve_active<R: WorldResolver>(&self, resolver: &R) -> ActiveClaims<R::Handle> {
        let mut handles: HashMap<String, Option<R::Handle>> = HashMap::new();
        let mut active: BTreeMap<u64, (ClaimRecord, R::Handle)> = BTreeMap::new();
        let mut unresolved = Vec::new();

        for record in self.all_claims() {
            let handle = handles
                .entry(record.world_name.clone())
                .or_insert_with(|| resolver.resolve_world(&record.world_name))
                .clone();
            match handle {
                Some(handle) => {
                    active.insert(record.id, (record, handle));
                }
                None => {
                    warn!(
                        world = %record.world_name,
                        claim = record.id,
                        "claim world not loaded, leaving claim inactive"
                    );
                    unresolved.push(CoreError::WorldUnresolvable {
                        world: record.world_name,
                        claim_id: record.id,
                    });
                }
            }
        }

        let mut children: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
        let mut root_ids = Vec::new();
        let mut orphans = Vec::new();

        for (id, (record, _)) in &active {
            match record.parent() {
                None => root_ids.push(*id),
                Some(parent) if active.contains_key(&parent) && parent != *id => {
                    children.entry(parent).or_default().push(*id);
                }
                Some(parent) => {
                    debug!(claim = id, parent, "parent claim not found, keeping as top-level");
                    orphans.push(*id);
                    root_ids.push(*id);
                }
            }
        }

        let mut visited = HashSet::with_capacity(active.len());
        let mut roots: Vec<ClaimNode<R::Handle>> = root_ids
            .iter()
            .filter_map(|&id| build_node(id, &active, &children, &mut visited))
            .collect();

        // Anything not reachable from a root sits on a parent cycle.
        let stranded: Vec<u64> = active
            .keys()
            .copied()
            .filter(|id| !visited.contains(id))
            .collect();
        for id in stranded {
            if let Some(node) = build_node(id, &active, &children, &mut visited) {
                warn!(claim = id, "claim is part of a parent cycle, promoting to top-level");
                orphans.push(id);
                roots.push(node);
            }
        }
        roots.sort_by_key(ClaimNode::id);
        orphans.sort_unstable();

        ActiveClaims {
            roots,
            unresolved,
            orphans,
        }
    }
}

fn build_node<H: Clone>(
    id: u64,
    active: &BTreeMap<u64, (ClaimRecord, H)>,
    children: &BTreeMap<u64, Vec<u64>>,
    visited: &mut HashSet<u64>,
) -> Option<ClaimNode<H>> {
    if !visited.insert(id) {
        return None;
    }
    let (record, world) = active.get(&id)?;

    let children = children
        .get(&id)
        .map(|ids| {
            ids.iter()
                .filter_map(|&child| build_node(child, active, children, visited))
                .collect()
        })
        .unwrap_or_default();

    Some(ClaimNode {
        record: record.clone(),
        world: world.clone(),
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::StaticWorlds;
    use claimstore_codec::Corner;
    use claimstore_storage::Compression;

    fn claim(id: u64, world: &str) -> ClaimRecord {
        ClaimRecord::new(id, world, Corner::new(0, 0, 0), Corner::new(9, 9, 9))
    }

    fn store_with(records: Vec<ClaimRecord>) -> ClaimStore {
        let store = ClaimStore::new("/unused", Compression::None);
        for record in records {
            store.mark_dirty(record);
        }
        store
    }

    #[test]
    fn links_subclaims_to_parents() {
        let store = store_with(vec![
            claim(1, "world"),
            claim(2, "world").with_parent(1),
            claim(3, "world").with_parent(1),
            claim(4, "world"),
        ]);
        let active = store.resolve_active(&StaticWorlds::new(["world"]));

        let roots: Vec<u64> = active.roots.iter().map(ClaimNode::id).collect();
        assert_eq!(roots, vec![1, 4]);
        let kids: Vec<u64> = active.roots[0].children.iter().map(ClaimNode::id).collect();
        assert_eq!(kids, vec![2, 3]);
        assert_eq!(active.len(), 4);
        assert!(active.orphans.is_empty());
        assert_eq!(active.find(3).map(|n| n.world.as_str()), Some("world"));
    }

    #[test]
    fn unknown_world_is_inactive_but_kept() {
        let store = store_with(vec![claim(1, "world"), claim(2, "gone")]);
        let active = store.resolve_active(&StaticWorlds::new(["world"]));

        assert_eq!(active.len(), 1);
        assert!(active.find(2).is_none());
        assert!(matches!(
            active.unresolved.as_slice(),
            [CoreError::WorldUnresolvable { claim_id: 2, world }] if world == "gone"
        ));
        assert!(store.get("gone", 2).is_some());
    }

    #[test]
    fn dangling_parent_stays_top_level() {
        let store = store_with(vec![claim(5, "world").with_parent(99)]);
        let active = store.resolve_active(&StaticWorlds::new(["world"]));

        assert_eq!(active.roots.len(), 1);
        assert_eq!(active.orphans, vec![5]);
        assert_eq!(active.roots[0].record.parent_id, 99);
    }

    #[test]
    fn subclaim_of_inactive_parent_becomes_top_level() {
        let store = store_with(vec![
            claim(1, "gone"),
            claim(2, "world").with_parent(1),
        ]);
        let active = store.resolve_active(&StaticWorlds::new(["world"]));
        assert_eq!(active.roots.len(), 1);
        assert_eq!(active.roots[0].id(), 2);
        assert_eq!(active.orphans, vec![2]);
    }

    #[test]
    fn parent_cycles_are_broken() {
        let store = store_with(vec![
            claim(1, "world").with_parent(2),
            claim(2, "world").with_parent(1),
            claim(3, "world").with_parent(3),
        ]);
        let active = store.resolve_active(&StaticWorlds::new(["world"]));

        assert_eq!(active.len(), 3);
        assert!(active.find(1).is_some());
        assert!(active.find(2).is_some());
        assert!(active.orphans.contains(&3));
    }
}
