//! JSON-over-HTTP transport for remote operations
//!
//! Client: `POST http://{peer.address}/rpc` with a [`RemoteOperation`] body.
//! Server: [`rpc_router`] answers from the local [`FetcherProbe`].

use async_trait::async_trait;
use axum::{extract::State, routing::post, Json, Router};
use std::sync::Arc;
use std::time::Duration;

use super::membership::PeerNode;
use super::registry::FetcherProbe;
use super::remote::{answer, RemoteError, RemoteInvoker, RemoteOperation, RemoteReply};

/// HTTP client implementation of [`RemoteInvoker`]
#[derive(Debug, Clone)]
pub struct HttpRemoteInvoker {
    client: reqwest::Client,
}

impl HttpRemoteInvoker {
    /// Create an invoker whose calls are bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    fn map_error(peer: &PeerNode, e: reqwest::Error) -> RemoteError {
        if e.is_timeout() {
            RemoteError::Timeout {
                peer: peer.name.clone(),
            }
        } else if e.is_decode() {
            RemoteError::BadResponse {
                peer: peer.name.clone(),
                reason: e.to_string(),
            }
        } else {
            RemoteError::Unreachable {
                peer: peer.name.clone(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl RemoteInvoker for HttpRemoteInvoker {
    async fn invoke(
        &self,
        peer: &PeerNode,
        operation: RemoteOperation,
    ) -> Result<RemoteReply, RemoteError> {
        let url = format!("http://{}/rpc", peer.address);
        log::debug!("📤 {:?} -> {} ({})", operation, peer.name, url);

        let response = self
            .client
            .post(&url)
            .json(&operation)
            .send()
            .await
            .map_err(|e| Self::map_error(peer, e))?;

        if !response.status().is_success() {
            return Err(RemoteError::BadResponse {
                peer: peer.name.clone(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        response
            .json::<RemoteReply>()
            .await
            .map_err(|e| Self::map_error(peer, e))
    }
}

/// Router answering remote operations for this node
pub fn rpc_router(probe: Arc<dyn FetcherProbe>) -> Router {
    Router::new()
        .route("/rpc", post(handle_rpc))
        .with_state(probe)
}

async fn handle_rpc(
    State(probe): State<Arc<dyn FetcherProbe>>,
    Json(operation): Json<RemoteOperation>,
) -> Json<RemoteReply> {
    log::debug!("📥 Remote operation: {:?}", operation);
    Json(answer(operation, probe.as_ref()))
}

/// Serve [`rpc_router`] on `bind_addr` until the task is dropped
pub async fn serve_rpc(
    bind_addr: &str,
    probe: Arc<dyn FetcherProbe>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    log::info!("🔌 Peer RPC listening on {}", listener.local_addr()?);
    axum::serve(listener, rpc_router(probe)).await?;
    Ok(())
}
