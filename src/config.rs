//! Node configuration from environment variables
//!
//! Loaded once at startup (after `dotenv`) and passed down by value.

use crate::cluster::discovery::MAX_DISCOVERY_ATTEMPTS;
use crate::cluster::membership::PeerNode;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How this process participates in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    /// Indexing and serving in one process
    AllInOne,
    /// Indexing only; hosts the fetcher workers
    Indexer,
    /// Serving only; fetchers live on an indexer peer
    Api,
}

impl DeploymentMode {
    /// True when fetcher workers can only ever run inside this process
    pub fn hosts_fetchers(&self) -> bool {
        matches!(self, DeploymentMode::AllInOne | DeploymentMode::Indexer)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentMode::AllInOne => "all_in_one",
            DeploymentMode::Indexer => "indexer",
            DeploymentMode::Api => "api",
        }
    }
}

impl FromStr for DeploymentMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all_in_one" | "all-in-one" | "all" => Ok(DeploymentMode::AllInOne),
            "indexer" => Ok(DeploymentMode::Indexer),
            "api" => Ok(DeploymentMode::Api),
            other => Err(ConfigError::InvalidValue {
                key: "DEPLOYMENT_MODE",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { key, value } => {
                write!(f, "Invalid value for {}: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for a priceflow node
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Deployment mode of this process
    pub deployment_mode: DeploymentMode,

    /// Name this node reports to peers
    pub node_name: String,

    /// Known cluster peers (excluding this node)
    pub peers: Vec<PeerNode>,

    /// Path to SQLite database holding current rates and market history
    pub db_path: String,

    /// Bind address of the peer RPC endpoint
    pub rpc_bind_addr: String,

    /// Upper bound for a single remote call
    pub remote_call_timeout: Duration,

    /// Zero-peer attempts before discovery gives up
    pub discovery_max_attempts: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            deployment_mode: DeploymentMode::AllInOne,
            node_name: "priceflow@localhost".to_string(),
            peers: Vec::new(),
            db_path: "/var/lib/priceflow/priceflow.db".to_string(),
            rpc_bind_addr: "0.0.0.0:4010".to_string(),
            remote_call_timeout: Duration::from_millis(5_000),
            discovery_max_attempts: 5,
        }
    }
}

impl NodeConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `DEPLOYMENT_MODE` (default: all_in_one; also `indexer`, `api`)
    /// - `NODE_NAME` (default: priceflow@localhost)
    /// - `CLUSTER_PEERS` comma-separated `name=role@host:port` (default: empty)
    /// - `PRICEFLOW_DB_PATH` (default: /var/lib/priceflow/priceflow.db)
    /// - `RPC_BIND_ADDR` (default: 0.0.0.0:4010)
    /// - `REMOTE_CALL_TIMEOUT_MS` (default: 5000)
    /// - `DISCOVERY_MAX_ATTEMPTS` (default: 5, at most 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let deployment_mode = match env::var("DEPLOYMENT_MODE") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.deployment_mode,
        };

        let peers = match env::var("CLUSTER_PEERS") {
            Ok(value) => value
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::parse)
                .collect::<Result<Vec<PeerNode>, ConfigError>>()?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            deployment_mode,
            node_name: env::var("NODE_NAME").unwrap_or(defaults.node_name),
            peers,
            db_path: env::var("PRICEFLOW_DB_PATH").unwrap_or(defaults.db_path),
            rpc_bind_addr: env::var("RPC_BIND_ADDR").unwrap_or(defaults.rpc_bind_addr),
            remote_call_timeout: env::var("REMOTE_CALL_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.remote_call_timeout),
            discovery_max_attempts: env::var("DISCOVERY_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|attempts: &u32| *attempts > 0)
                .map(clamp_discovery_attempts)
                .unwrap_or(defaults.discovery_max_attempts),
        })
    }
}

fn clamp_discovery_attempts(attempts: u32) -> u32 {
    if attempts > MAX_DISCOVERY_ATTEMPTS {
        log::warn!(
            "⚠️  DISCOVERY_MAX_ATTEMPTS={} exceeds {}, clamping",
            attempts,
            MAX_DISCOVERY_ATTEMPTS
        );
        return MAX_DISCOVERY_ATTEMPTS;
    }
    attempts
}
