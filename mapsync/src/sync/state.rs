//! Lifecycle state of a managed source.
//!
//! ```text
//! Unattached ──attach──► Registering ──register──► Loading ──load──► Loaded
//!                            ▲                        │                │
//!                            └──── style reset ───────┴────────────────┘
//!
//! Loading/Loaded ──destructive replace──► Loading
//! any attached state ──detach──► Detached
//! ```

use std::fmt;

/// Where a [`super::SourceSync`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    /// Constructed, attach hook not yet called.
    Unattached,
    /// Attached, but no source registered (no descriptor yet, or lost to a
    /// style reset and not yet recovered).
    Registering,
    /// Source registered, waiting for the engine to report it loaded.
    Loading,
    /// Source registered and loaded.
    Loaded,
    /// Detach hook ran. Terminal.
    Detached,
}

impl SyncState {
    /// Whether lifecycle hooks other than attach are allowed.
    pub fn is_attached(self) -> bool {
        matches!(
            self,
            SyncState::Registering | SyncState::Loading | SyncState::Loaded
        )
    }

    /// Whether moving to `next` is a legal transition.
    pub fn allows(self, next: SyncState) -> bool {
        use SyncState::*;

        match (self, next) {
            (Unattached, Registering) => true,
            (Registering, Registering | Loading | Detached) => true,
            (Loading, Registering | Loading | Loaded | Detached) => true,
            (Loaded, Registering | Loading | Loaded | Detached) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Unattached => "unattached",
            SyncState::Registering => "registering",
            SyncState::Loading => "loading",
            SyncState::Loaded => "loaded",
            SyncState::Detached => "detached",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_is_terminal() {
        for next in [
            SyncState::Unattached,
            SyncState::Registering,
            SyncState::Loading,
            SyncState::Loaded,
            SyncState::Detached,
        ] {
            assert!(!SyncState::Detached.allows(next));
        }
    }

    #[test]
    fn test_detach_only_from_attached_states() {
        assert!(!SyncState::Unattached.allows(SyncState::Detached));
        assert!(SyncState::Registering.allows(SyncState::Detached));
        assert!(SyncState::Loading.allows(SyncState::Detached));
        assert!(SyncState::Loaded.allows(SyncState::Detached));
    }

    #[test]
    fn test_reset_returns_to_registering() {
        assert!(SyncState::Loaded.allows(SyncState::Registering));
        assert!(SyncState::Loading.allows(SyncState::Registering));
        assert!(!SyncState::Registering.allows(SyncState::Loaded));
    }

    #[test]
    fn test_is_attached() {
        assert!(!SyncState::Unattached.is_attached());
        assert!(SyncState::Loading.is_attached());
        assert!(!SyncState::Detached.is_attached());
    }
}
