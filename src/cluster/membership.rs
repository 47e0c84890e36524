//! Cluster peer handles and membership listing

use crate::config::ConfigError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Role a peer advertises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Indexer,
    Api,
    AllInOne,
}

impl FromStr for NodeRole {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "indexer" => Ok(NodeRole::Indexer),
            "api" => Ok(NodeRole::Api),
            "all_in_one" | "all-in-one" | "all" => Ok(NodeRole::AllInOne),
            other => Err(ConfigError::InvalidValue {
                key: "CLUSTER_PEERS",
                value: other.to_string(),
            }),
        }
    }
}

/// A live cluster peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerNode {
    pub name: String,
    /// `host:port` of the peer RPC endpoint
    pub address: String,
    pub role: NodeRole,
}

impl PeerNode {
    pub fn new(name: impl Into<String>, address: impl Into<String>, role: NodeRole) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            role,
        }
    }

    /// Whether this peer runs the indexer (and with it the fetcher workers)
    pub fn is_indexer(&self) -> bool {
        self.role == NodeRole::Indexer
    }
}

/// Parses `name=role@host:port`
impl FromStr for PeerNode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidValue {
            key: "CLUSTER_PEERS",
            value: s.to_string(),
        };

        let (name, rest) = s.split_once('=').ok_or_else(invalid)?;
        let (role, address) = rest.split_once('@').ok_or_else(invalid)?;
        let (name, address) = (name.trim(), address.trim());
        if name.is_empty() || address.is_empty() {
            return Err(invalid());
        }

        Ok(PeerNode::new(name, address, role.parse()?))
    }
}

/// Source of the currently live cluster peers
#[async_trait]
pub trait ClusterMembership: Send + Sync {
    /// Peers currently connected to this node (never includes self)
    async fn list_peers(&self) -> Vec<PeerNode>;
}

/// Fixed peer list taken from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticMembership {
    peers: Vec<PeerNode>,
}

impl StaticMembership {
    pub fn new(peers: Vec<PeerNode>) -> Self {
        Self { peers }
    }
}

#[async_trait]
impl ClusterMembership for StaticMembership {
    async fn list_peers(&self) -> Vec<PeerNode> {
        self.peers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_peer() {
        let peer: PeerNode = "indexer-1=indexer@10.0.0.5:4010".parse().unwrap();
        assert_eq!(peer.name, "indexer-1");
        assert_eq!(peer.address, "10.0.0.5:4010");
        assert!(peer.is_indexer());

        let api: PeerNode = "web=API@web.internal:4010".parse().unwrap();
        assert_eq!(api.role, NodeRole::Api);
        assert!(!api.is_indexer());
    }

    #[test]
    fn test_parse_peer_rejects_malformed() {
        assert!("no-role-here".parse::<PeerNode>().is_err());
        assert!("x=indexer".parse::<PeerNode>().is_err());
        assert!("x=worker@host:1".parse::<PeerNode>().is_err());
        assert!("=indexer@host:1".parse::<PeerNode>().is_err());
    }

    #[tokio::test]
    async fn test_static_membership_lists_configured_peers() {
        let membership = StaticMembership::new(vec![
            PeerNode::new("a", "a:1", NodeRole::Indexer),
            PeerNode::new("b", "b:1", NodeRole::Api),
        ]);

        let peers = membership.list_peers().await;
        assert_eq!(peers.len(), 2);
        assert_eq!(peers.iter().filter(|p| p.is_indexer()).count(), 1);
    }
}
