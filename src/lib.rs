//! # priceflow
//!
//! Fetcher discovery and exchange-rate resolution for multi-node deployments.
//!
//! Exactly one node class (the indexer) runs the market-data fetchers. At
//! startup every node works out whether those fetchers are alive somewhere in
//! the cluster and publishes the answer once as process-wide [`RoleFlags`].
//! The exchange-rate read path consults those flags and falls back to a null
//! rate instead of failing.
//!
//! ## Startup
//!
//! 1. [`RoleResolver`] checks the deployment mode
//! 2. All-in-one / indexer nodes probe their local [`WorkerRegistry`]
//! 3. API nodes spawn a [`DiscoveryLoop`] that queries the single indexer peer
//!
//! ## Reads
//!
//! [`ExchangeRateResolver`] serves current rates, historical rates and recent
//! history from a [`RateSource`] chain.

pub mod cluster;
pub mod config;
pub mod rates;

pub use cluster::{DiscoveryLoop, RoleFlags, RoleFlagsCell, RoleResolver, WorkerRegistry};
pub use config::{DeploymentMode, NodeConfig};
pub use rates::{ExchangeRate, ExchangeRateResolver, HistoryPoint, RateSource};
