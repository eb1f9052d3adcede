//! Guild and channel blacklists.

use std::collections::HashSet;
use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Which kind of origin an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Guild,
    Channel,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guild => write!(f, "guild"),
            Self::Channel => write!(f, "channel"),
        }
    }
}

/// Blocks command processing for blacklisted guilds and channels.
#[derive(Debug, Default)]
pub struct AccessGate {
    guilds: RwLock<HashSet<u64>>,
    channels: RwLock<HashSet<u64>>,
}

impl AccessGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gate with initial blacklists.
    pub fn with_lists(
        guilds: impl IntoIterator<Item = u64>,
        channels: impl IntoIterator<Item = u64>,
    ) -> Self {
        Self {
            guilds: RwLock::new(guilds.into_iter().collect()),
            channels: RwLock::new(channels.into_iter().collect()),
        }
    }

    fn list(&self, scope: Scope) -> &RwLock<HashSet<u64>> {
        match scope {
            Scope::Guild => &self.guilds,
            Scope::Channel => &self.channels,
        }
    }

    pub fn is_blocked(&self, id: u64, scope: Scope) -> bool {
        self.list(scope).read().contains(&id)
    }

    /// Blacklists `id`. Returns `false` if it already was.
    pub fn add(&self, scope: Scope, id: u64) -> bool {
        self.list(scope).write().insert(id)
    }

    pub fn extend(&self, scope: Scope, ids: impl IntoIterator<Item = u64>) {
        self.list(scope).write().extend(ids);
    }

    /// Removes `id`. Returns `false` if it was not blacklisted.
    pub fn remove(&self, scope: Scope, id: u64) -> bool {
        self.list(scope).write().remove(&id)
    }

    /// Removes every id. Returns `true` only if all of them were present.
    pub fn remove_all(&self, scope: Scope, ids: impl IntoIterator<Item = u64>) -> bool {
        let mut list = self.list(scope).write();
        ids.into_iter().fold(true, |all, id| list.remove(&id) && all)
    }

    pub fn clear(&self, scope: Scope) {
        self.list(scope).write().clear();
    }

    pub fn len(&self, scope: Scope) -> usize {
        self.list(scope).read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_are_independent() {
        let gate = AccessGate::new();
        gate.add(Scope::Guild, 1);

        assert!(gate.is_blocked(1, Scope::Guild));
        assert!(!gate.is_blocked(1, Scope::Channel));
    }

    #[test]
    fn test_add_and_remove() {
        let gate = AccessGate::new();
        assert!(gate.add(Scope::Channel, 5));
        assert!(!gate.add(Scope::Channel, 5));
        assert!(gate.is_blocked(5, Scope::Channel));

        assert!(gate.remove(Scope::Channel, 5));
        assert!(!gate.remove(Scope::Channel, 5));
        assert!(!gate.is_blocked(5, Scope::Channel));
    }

    #[test]
    fn test_batch_operations() {
        let gate = AccessGate::new();
        gate.extend(Scope::Guild, [1, 2, 3]);
        assert_eq!(gate.len(Scope::Guild), 3);

        // 4 was never present, but 1 and 2 are still removed.
        assert!(!gate.remove_all(Scope::Guild, [1, 2, 4]));
        assert_eq!(gate.len(Scope::Guild), 1);
        assert!(gate.is_blocked(3, Scope::Guild));

        assert!(gate.remove_all(Scope::Guild, [3]));
        assert_eq!(gate.len(Scope::Guild), 0);
    }

    #[test]
    fn test_clear() {
        let gate = AccessGate::with_lists([1, 2], [3]);
        gate.clear(Scope::Guild);

        assert_eq!(gate.len(Scope::Guild), 0);
        assert!(gate.is_blocked(3, Scope::Channel));
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(Scope::Guild.to_string(), "guild");
        assert_eq!(Scope::Channel.to_string(), "channel");
    }
}
