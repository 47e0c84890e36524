//! Cluster coordination for the market-data fetchers
//!
//! Determines once per process whether the history and token fetchers are
//! alive somewhere in the cluster and publishes the answer as [`RoleFlags`].
//!
//! ## Module Organization
//!
//! - `roles` - Write-once process-wide flags
//! - `registry` - Local worker registry and fetcher probe
//! - `membership` - Peer handles and membership listing
//! - `remote` - Remote operation types and invoker trait
//! - `http` - JSON-over-HTTP transport (client and axum router)
//! - `discovery` - Bounded-retry indexer discovery
//! - `resolver` - Startup role resolution

pub mod discovery;
pub mod http;
pub mod membership;
pub mod registry;
pub mod remote;
pub mod resolver;
pub mod roles;

pub use discovery::{
    DiscoveryConfig, DiscoveryError, DiscoveryLoop, DiscoveryState, MAX_DISCOVERY_ATTEMPTS,
};
pub use http::{rpc_router, serve_rpc, HttpRemoteInvoker};
pub use membership::{ClusterMembership, NodeRole, PeerNode, StaticMembership};
pub use registry::{FetcherLiveness, FetcherProbe, WorkerRegistry, HISTORY_FETCHER, TOKEN_FETCHER};
pub use remote::{RemoteError, RemoteInvoker, RemoteOperation, RemoteReply};
pub use resolver::{RoleResolution, RoleResolver};
pub use roles::{RoleFlags, RoleFlagsCell};
