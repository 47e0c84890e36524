//! Local registry of named background workers
//!
//! Fetcher workers register their task handle under a well-known name. A
//! worker counts as live while it is registered and its task has not
//! finished.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::task::JoinHandle;

use super::roles::RoleFlags;

/// Registry name of the market history fetcher
pub const HISTORY_FETCHER: &str = "history_fetcher";

/// Registry name of the token exchange-rate fetcher
pub const TOKEN_FETCHER: &str = "token_fetcher";

/// Liveness of the two fetchers on one node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetcherLiveness {
    pub history: bool,
    pub token: bool,
}

impl From<FetcherLiveness> for RoleFlags {
    fn from(liveness: FetcherLiveness) -> Self {
        RoleFlags::new(liveness.history, liveness.token)
    }
}

/// Local existence check for the fetcher workers
pub trait FetcherProbe: Send + Sync {
    fn fetcher_liveness(&self) -> FetcherLiveness;
}

/// Named worker handles for this process
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self {
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Register a worker task under `name`
    ///
    /// A previous worker with the same name is aborted and replaced.
    pub fn register(&self, name: &str, handle: JoinHandle<()>) {
        let mut workers = self.workers.lock().unwrap();
        if let Some(previous) = workers.insert(name.to_string(), handle) {
            log::warn!("⚠️  Replacing already registered worker: {}", name);
            previous.abort();
        } else {
            log::info!("🧵 Registered worker: {}", name);
        }
    }

    pub fn is_alive(&self, name: &str) -> bool {
        self.workers
            .lock()
            .unwrap()
            .get(name)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Names of all registered workers that are still running
    pub fn live_workers(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .workers
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

impl FetcherProbe for WorkerRegistry {
    fn fetcher_liveness(&self) -> FetcherLiveness {
        FetcherLiveness {
            history: self.is_alive(HISTORY_FETCHER),
            token: self.is_alive(TOKEN_FETCHER),
        }
    }
}
