//! Remote operations between cluster nodes
//!
//! The transport only moves requests and replies. Fallback behavior on
//! failure belongs to the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::membership::PeerNode;
use super::registry::{FetcherLiveness, FetcherProbe};

/// Operations a node can ask a peer to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RemoteOperation {
    /// Report which fetcher workers are live on the peer
    FetcherLiveness,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum RemoteReply {
    FetcherLiveness(FetcherLiveness),
}

#[derive(Debug)]
pub enum RemoteError {
    /// No reply within the allowed time
    Timeout { peer: String },
    /// Peer could not be reached
    Unreachable { peer: String, reason: String },
    /// Peer replied with something unusable
    BadResponse { peer: String, reason: String },
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Timeout { peer } => write!(f, "Remote call to {} timed out", peer),
            RemoteError::Unreachable { peer, reason } => {
                write!(f, "Peer {} unreachable: {}", peer, reason)
            }
            RemoteError::BadResponse { peer, reason } => {
                write!(f, "Bad response from {}: {}", peer, reason)
            }
        }
    }
}

impl std::error::Error for RemoteError {}

/// Invoke a named operation on a specific peer
///
/// Implementations must return within a bounded time.
#[async_trait]
pub trait RemoteInvoker: Send + Sync {
    async fn invoke(
        &self,
        peer: &PeerNode,
        operation: RemoteOperation,
    ) -> Result<RemoteReply, RemoteError>;
}

/// Run a remote operation against the local node
pub fn answer(operation: RemoteOperation, probe: &dyn FetcherProbe) -> RemoteReply {
    match operation {
        RemoteOperation::FetcherLiveness => RemoteReply::FetcherLiveness(probe.fetcher_liveness()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe(FetcherLiveness);

    impl FetcherProbe for FixedProbe {
        fn fetcher_liveness(&self) -> FetcherLiveness {
            self.0
        }
    }

    #[test]
    fn test_answer_uses_local_probe() {
        let probe = FixedProbe(FetcherLiveness {
            history: true,
            token: false,
        });

        let reply = answer(RemoteOperation::FetcherLiveness, &probe);
        assert_eq!(
            reply,
            RemoteReply::FetcherLiveness(FetcherLiveness {
                history: true,
                token: false,
            })
        );
    }

    #[test]
    fn test_wire_shape() {
        let request = serde_json::to_string(&RemoteOperation::FetcherLiveness).unwrap();
        assert_eq!(request, r#"{"op":"fetcher_liveness"}"#);

        let reply: RemoteReply = serde_json::from_str(
            r#"{"reply":"fetcher_liveness","history":false,"token":true}"#,
        )
        .unwrap();
        assert_eq!(
            reply,
            RemoteReply::FetcherLiveness(FetcherLiveness {
                history: false,
                token: true,
            })
        );
    }
}
