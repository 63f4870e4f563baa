//! World lookup capability supplied by the host.

use std::collections::BTreeSet;

/// Resolves world names to live world handles.
///
/// The store only ever sees world names. The host decides which worlds
/// exist; claims in worlds it cannot resolve are kept on disk but left out
/// of the active set.
pub trait WorldResolver: Send + Sync {
    /// Handle type the host uses for a loaded world.
    type Handle: Clone;

    /// Looks up a world by exact name.
    fn resolve_world(&self, name: &str) -> Option<Self::Handle>;

    /// Names of every world currently known to the host.
    fn world_names(&self) -> Vec<String>;

    /// Finds the host's spelling of `name`, ignoring ASCII case. An exact
    /// match wins.
    fn match_world_name(&self, name: &str) -> Option<String> {
        if self.resolve_world(name).is_some() {
            return Some(name.to_string());
        }
        self.world_names()
            .into_iter()
            .find(|known| known.eq_ignore_ascii_case(name))
    }
}

/// A fixed set of world names; the handle is the name itself.
#[derive(Debug, Clone, Default)]
pub struct StaticWorlds {
    names: BTreeSet<String>,
}

impl StaticWorlds {
    /// Creates a resolver for the given names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds a world.
    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }
}

impl WorldResolver for StaticWorlds {
    type Handle = String;

    fn resolve_world(&self, name: &str) -> Option<String> {
        self.names.get(name).cloned()
    }

    fn world_names(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_worlds_resolve_exact_names() {
        let worlds = StaticWorlds::new(["world", "world_nether"]);
        assert_eq!(worlds.resolve_world("world"), Some("world".to_string()));
        assert_eq!(worlds.resolve_world("World"), None);
        assert_eq!(worlds.world_names(), vec!["world", "world_nether"]);
    }

    #[test]
    fn ignore_case_falls_back_to_known_names() {
        let worlds = StaticWorlds::new(["World"]);
        assert_eq!(worlds.match_world_name("world"), Some("World".to_string()));
        assert_eq!(worlds.match_world_name("World"), Some("World".to_string()));
        assert_eq!(worlds.match_world_name("end"), None);
    }
}
