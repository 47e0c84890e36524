//! Startup role resolution
//!
//! Nodes that host the fetchers answer from the local worker registry right
//! away. API nodes hand off to [`DiscoveryLoop`].

use std::sync::Arc;
use tokio::task::JoinHandle;

use super::discovery::{DiscoveryError, DiscoveryLoop};
use super::registry::FetcherProbe;
use super::roles::{RoleFlags, RoleFlagsCell};
use crate::config::DeploymentMode;

/// Outcome of [`RoleResolver::start`]
#[derive(Debug)]
pub enum RoleResolution {
    /// Flags were published synchronously from the local probe
    Local(RoleFlags),
    /// Discovery is running in the background
    Deferred(JoinHandle<Result<RoleFlags, DiscoveryError>>),
}

pub struct RoleResolver {
    mode: DeploymentMode,
    probe: Arc<dyn FetcherProbe>,
    flags: Arc<RoleFlagsCell>,
}

impl RoleResolver {
    pub fn new(mode: DeploymentMode, probe: Arc<dyn FetcherProbe>, flags: Arc<RoleFlagsCell>) -> Self {
        Self { mode, probe, flags }
    }

    /// Publish flags from the local probe when this node hosts the fetchers
    ///
    /// Returns `None` on API nodes, which must discover an indexer instead.
    pub fn resolve_locally(&self) -> Option<RoleFlags> {
        if !self.mode.hosts_fetchers() {
            return None;
        }

        let flags: RoleFlags = self.probe.fetcher_liveness().into();
        log::info!(
            "🏠 {} mode: fetchers resolved from local registry",
            self.mode
        );
        // On a repeated call the first published value is kept
        match self.flags.publish(flags) {
            Ok(()) => Some(flags),
            Err(existing) => Some(existing),
        }
    }

    /// Resolve locally, or spawn `discovery` when the node does not host fetchers
    pub fn start(&self, discovery: DiscoveryLoop) -> RoleResolution {
        match self.resolve_locally() {
            Some(flags) => RoleResolution::Local(flags),
            None => {
                log::info!("🌐 {} mode: deferring to fetcher discovery", self.mode);
                RoleResolution::Deferred(discovery.spawn())
            }
        }
    }
}
