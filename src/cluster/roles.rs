//! Process-wide fetcher role flags
//!
//! The flags are published exactly once per process, either by the local
//! probe (all-in-one / indexer nodes) or by the discovery loop (API nodes).
//! Readers take a copy of the published value; nothing is ever locked.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

/// Whether the market-data fetchers are alive somewhere in the cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleFlags {
    pub history_fetcher_enabled: bool,
    pub token_fetcher_enabled: bool,
}

impl RoleFlags {
    pub fn new(history_fetcher_enabled: bool, token_fetcher_enabled: bool) -> Self {
        Self {
            history_fetcher_enabled,
            token_fetcher_enabled,
        }
    }

    /// Conservative value used when a peer cannot be queried
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// Write-once holder for [`RoleFlags`]
///
/// Both flags live in one value, so a reader sees either nothing or the
/// complete pair.
#[derive(Debug, Default)]
pub struct RoleFlagsCell {
    flags: OnceLock<RoleFlags>,
}

static GLOBAL_ROLE_FLAGS: OnceLock<Arc<RoleFlagsCell>> = OnceLock::new();

impl RoleFlagsCell {
    pub fn new() -> Self {
        Self {
            flags: OnceLock::new(),
        }
    }

    /// The cell shared by everything in this process
    pub fn global() -> Arc<RoleFlagsCell> {
        GLOBAL_ROLE_FLAGS
            .get_or_init(|| Arc::new(RoleFlagsCell::new()))
            .clone()
    }

    /// Publish the flags
    ///
    /// Returns `Err` with the already-published value if the cell was
    /// written before; the new value is discarded.
    pub fn publish(&self, flags: RoleFlags) -> Result<(), RoleFlags> {
        match self.flags.set(flags) {
            Ok(()) => {
                log::info!(
                    "🏷️  Role flags published: history_fetcher={} token_fetcher={}",
                    flags.history_fetcher_enabled,
                    flags.token_fetcher_enabled
                );
                Ok(())
            }
            Err(_) => {
                let existing = self.snapshot();
                log::warn!(
                    "⚠️  Role flags already published ({:?}), ignoring {:?}",
                    existing,
                    flags
                );
                Err(existing)
            }
        }
    }

    /// Published flags, or `None` while resolution is still pending
    pub fn get(&self) -> Option<RoleFlags> {
        self.flags.get().copied()
    }

    /// Published flags, treating "not yet resolved" as both disabled
    pub fn snapshot(&self) -> RoleFlags {
        self.get().unwrap_or_default()
    }

    pub fn is_resolved(&self) -> bool {
        self.flags.get().is_some()
    }

    pub fn is_history_fetcher_enabled(&self) -> bool {
        self.snapshot().history_fetcher_enabled
    }

    pub fn is_token_fetcher_enabled(&self) -> bool {
        self.snapshot().token_fetcher_enabled
    }
}
