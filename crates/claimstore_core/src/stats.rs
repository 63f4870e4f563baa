//! Storage statistics.

use crate::claims::ClaimStore;
use crate::players::PlayerStore;
use serde::Serialize;
use std::fmt;

/// Record counts for an open data directory.
///
/// ```rust,ignore
/// let stats = engine.stats();
/// println!("{stats}");
/// // Claims: 12 (+3 subclaims), Players: 40, Groups: 2, Compression: disabled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StorageStats {
    /// Top-level claims.
    pub total_claims: usize,
    /// Sub-claims.
    pub total_subclaims: usize,
    /// Players with stored data.
    pub total_players: usize,
    /// Groups with a bonus.
    pub total_groups: usize,
    /// Whether files are gzip-compressed.
    pub compression: bool,
}

impl StorageStats {
    /// Counts the records currently held by both stores.
    #[must_use]
    pub fn collect(claims: &ClaimStore, players: &PlayerStore) -> Self {
        let (total_claims, total_subclaims) =
            claims
                .all_claims()
                .iter()
                .fold((0usize, 0usize), |(top, sub), record| {
                    if record.is_top_level() {
                        (top + 1, sub)
                    } else {
                        (top, sub + 1)
                    }
                });

        Self {
            total_claims,
            total_subclaims,
            total_players: players.player_count(),
            total_groups: players.all_group_bonuses().len(),
            compression: claims.compression().is_enabled(),
        }
    }
}

impl fmt::Display for StorageStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Claims: {} (+{} subclaims), Players: {}, Groups: {}, Compression: {}",
            self.total_claims,
            self.total_subclaims,
            self.total_players,
            self.total_groups,
            if self.compression { "enabled" } else { "disabled" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimstore_codec::{ClaimRecord, Corner};
    use claimstore_storage::Compression;
    use uuid::Uuid;

    #[test]
    fn counts_and_display() {
        let claims = ClaimStore::new("/unused", Compression::Gzip);
        let players = PlayerStore::new("/unused", Compression::Gzip);
        let record = |id| ClaimRecord::new(id, "w", Corner::default(), Corner::new(1, 1, 1));
        claims.mark_dirty(record(1));
        claims.mark_dirty(record(2).with_parent(1));
        claims.mark_dirty(record(3));
        players.set_player_data(Uuid::new_v4(), 10, 0);
        players.set_group_bonus("vip", 5);

        let stats = StorageStats::collect(&claims, &players);
        assert_eq!(
            stats,
            StorageStats {
                total_claims: 2,
                total_subclaims: 1,
                total_players: 1,
                total_groups: 1,
                compression: true,
            }
        );
        assert_eq!(
            stats.to_string(),
            "Claims: 2 (+1 subclaims), Players: 1, Groups: 1, Compression: enabled"
        );
    }
}
