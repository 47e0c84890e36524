//! Fetcher discovery against indexer peers
//!
//! Bounded-retry state machine run once at startup on nodes that do not host
//! the fetchers themselves. Each attempt sleeps `attempt` seconds, then looks
//! for exactly one indexer peer among the live cluster members:
//!
//! - no indexer: retry with the attempt index doubled (1, 2, 4, 8, 16, ...)
//!   until the attempt budget is spent, then fail
//! - one indexer: ask it for its fetcher liveness and publish the result
//! - several indexers: fail immediately
//!
//! A failed remote call publishes both flags as disabled instead of failing.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use super::membership::{ClusterMembership, PeerNode};
use super::remote::{RemoteInvoker, RemoteOperation, RemoteReply};
use super::roles::{RoleFlags, RoleFlagsCell};

/// Fatal discovery outcome; the node must not keep running unresolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// No indexer peer appeared within the attempt budget
    NoIndexerFound { attempts: u32 },
    /// More than one peer claims the indexer role
    AmbiguousIndexers { peers: Vec<String> },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::NoIndexerFound { attempts } => write!(
                f,
                "No indexer node found in the cluster after {} attempts",
                attempts
            ),
            DiscoveryError::AmbiguousIndexers { peers } => write!(
                f,
                "Expected exactly one indexer node, found {}: {}",
                peers.len(),
                peers.join(", ")
            ),
        }
    }
}

impl std::error::Error for DiscoveryError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryState {
    /// Attempt with the given 1-based attempt index pending
    Attempting(u32),
    Resolved(RoleFlags),
    Failed(DiscoveryError),
}

/// Largest accepted attempt budget (last attempt index 512, about 17 minutes in total)
pub const MAX_DISCOVERY_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Zero-indexer attempts before giving up, clamped to `1..=MAX_DISCOVERY_ATTEMPTS`
    pub max_attempts: u32,
    /// Sleep per unit of attempt index
    pub base_delay: Duration,
    /// Upper bound for the liveness query, on top of the transport's own
    pub remote_call_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            remote_call_timeout: Duration::from_secs(5),
        }
    }
}

pub struct DiscoveryLoop {
    membership: Arc<dyn ClusterMembership>,
    invoker: Arc<dyn RemoteInvoker>,
    flags: Arc<RoleFlagsCell>,
    config: DiscoveryConfig,
}

impl DiscoveryLoop {
    pub fn new(
        membership: Arc<dyn ClusterMembership>,
        invoker: Arc<dyn RemoteInvoker>,
        flags: Arc<RoleFlagsCell>,
        mut config: DiscoveryConfig,
    ) -> Self {
        config.max_attempts = config.max_attempts.clamp(1, MAX_DISCOVERY_ATTEMPTS);
        Self {
            membership,
            invoker,
            flags,
            config,
        }
    }

    /// Attempt index of the final zero-indexer attempt
    fn last_attempt_index(&self) -> u32 {
        1u32 << (self.config.max_attempts - 1)
    }

    /// Run until resolved or failed, publishing the flags on success
    pub async fn run(&self) -> Result<RoleFlags, DiscoveryError> {
        log::info!(
            "🔍 Starting fetcher discovery (max {} attempts)",
            self.config.max_attempts
        );

        let mut state = DiscoveryState::Attempting(1);
        loop {
            state = match state {
                DiscoveryState::Attempting(attempt) => self.step(attempt).await,
                DiscoveryState::Resolved(flags) => {
                    // The first published value wins; report what readers see
                    let flags = match self.flags.publish(flags) {
                        Ok(()) => flags,
                        Err(existing) => existing,
                    };
                    log::info!("✅ Fetcher discovery resolved: {:?}", flags);
                    return Ok(flags);
                }
                DiscoveryState::Failed(e) => {
                    log::error!("❌ Fetcher discovery failed: {}", e);
                    return Err(e);
                }
            };
        }
    }

    /// Spawn [`run`](Self::run) as its own task
    pub fn spawn(self) -> JoinHandle<Result<RoleFlags, DiscoveryError>> {
        tokio::spawn(async move { self.run().await })
    }

    /// Perform a single attempt and return the next state
    pub async fn step(&self, attempt: u32) -> DiscoveryState {
        sleep(self.config.base_delay * attempt).await;

        let indexers: Vec<PeerNode> = self
            .membership
            .list_peers()
            .await
            .into_iter()
            .filter(PeerNode::is_indexer)
            .collect();

        match indexers.as_slice() {
            [] if attempt < self.last_attempt_index() => {
                log::warn!(
                    "⏳ No indexer node visible (attempt index {}), retrying",
                    attempt
                );
                DiscoveryState::Attempting(attempt.saturating_mul(2))
            }
            [] => DiscoveryState::Failed(DiscoveryError::NoIndexerFound {
                attempts: attempt.trailing_zeros() + 1,
            }),
            [peer] => DiscoveryState::Resolved(self.query_peer(peer).await),
            many => DiscoveryState::Failed(DiscoveryError::AmbiguousIndexers {
                peers: many.iter().map(|p| p.name.clone()).collect(),
            }),
        }
    }

    /// Ask the indexer for its fetcher liveness, defaulting to disabled
    async fn query_peer(&self, peer: &PeerNode) -> RoleFlags {
        log::info!("📡 Querying fetcher liveness on indexer {}", peer.name);

        let call = self.invoker.invoke(peer, RemoteOperation::FetcherLiveness);
        match timeout(self.config.remote_call_timeout, call).await {
            Ok(Ok(RemoteReply::FetcherLiveness(liveness))) => liveness.into(),
            Ok(Err(e)) => {
                log::warn!("⚠️  {}; treating fetchers as disabled", e);
                RoleFlags::disabled()
            }
            Err(_) => {
                log::warn!(
                    "⚠️  Remote call to {} exceeded {:?}; treating fetchers as disabled",
                    peer.name,
                    self.config.remote_call_timeout
                );
                RoleFlags::disabled()
            }
        }
    }
}
