//! priceflow node
//!
//! - Opens the rate store (SQLite behind an in-process cache)
//! - Serves the peer RPC endpoint answering fetcher-liveness queries
//! - Resolves fetcher role flags (locally or via indexer discovery)
//! - Exits non-zero when discovery fails
//!
//! Usage:
//!   cargo run --release --bin priceflow-node
//!
//! Environment variables:
//!   DEPLOYMENT_MODE - all_in_one | indexer | api (default: all_in_one)
//!   CLUSTER_PEERS - name=role@host:port,... (default: empty)
//!   PRICEFLOW_DB_PATH - SQLite database path (default: /var/lib/priceflow/priceflow.db)
//!   RPC_BIND_ADDR - Peer RPC bind address (default: 0.0.0.0:4010)
//!   REMOTE_CALL_TIMEOUT_MS - Remote call bound (default: 5000)
//!   DISCOVERY_MAX_ATTEMPTS - Zero-indexer attempts (default: 5)

use dotenv::dotenv;
use log::{error, info, warn};
use priceflow::cluster::{
    serve_rpc, DiscoveryConfig, DiscoveryLoop, FetcherProbe, HttpRemoteInvoker, RoleFlagsCell,
    RoleResolution, RoleResolver, StaticMembership, WorkerRegistry,
};
use priceflow::config::NodeConfig;
use priceflow::rates::{ChainedRateSource, ExchangeRateResolver, MemoryRateStore, SqliteRateStore};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = NodeConfig::from_env()?;

    info!("🚀 Starting priceflow node");
    info!("   ├─ Node: {}", config.node_name);
    info!("   ├─ Mode: {}", config.deployment_mode);
    info!("   ├─ Peers: {}", config.peers.len());
    info!("   ├─ Database: {}", config.db_path);
    info!("   └─ RPC: {}", config.rpc_bind_addr);

    // Rate storage
    if let Some(parent) = Path::new(&config.db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Arc::new(SqliteRateStore::open(&config.db_path)?);
    let cache = Arc::new(MemoryRateStore::new());
    let source = ChainedRateSource::default().push(cache).push(db);

    // Fetcher tasks attach here with `registry.register(HISTORY_FETCHER, handle)`
    // and `registry.register(TOKEN_FETCHER, handle)`. None are spawned by this
    // binary, so a node hosting fetchers reports them disabled until they are.
    let registry = Arc::new(WorkerRegistry::new());
    info!("🧵 Local workers: {:?}", registry.live_workers());
    let flags = RoleFlagsCell::global();

    let rpc_probe: Arc<dyn FetcherProbe> = registry.clone();
    let bind_addr = config.rpc_bind_addr.clone();
    let rpc_handle = tokio::spawn(async move {
        if let Err(e) = serve_rpc(&bind_addr, rpc_probe).await {
            error!("❌ Peer RPC server error: {}", e);
        }
    });

    let discovery = DiscoveryLoop::new(
        Arc::new(StaticMembership::new(config.peers.clone())),
        Arc::new(HttpRemoteInvoker::new(config.remote_call_timeout)?),
        flags.clone(),
        DiscoveryConfig {
            max_attempts: config.discovery_max_attempts,
            remote_call_timeout: config.remote_call_timeout,
            ..Default::default()
        },
    );

    let resolver = RoleResolver::new(config.deployment_mode, registry.clone(), flags.clone());
    let role_flags = match resolver.start(discovery) {
        RoleResolution::Local(role_flags) => role_flags,
        RoleResolution::Deferred(handle) => match handle.await {
            Ok(Ok(role_flags)) => role_flags,
            Ok(Err(e)) => {
                error!("❌ Fatal: {}", e);
                std::process::exit(1);
            }
            Err(e) => {
                error!("❌ Fatal: discovery task aborted: {}", e);
                std::process::exit(1);
            }
        },
    };

    let rates = ExchangeRateResolver::new(flags, Arc::new(source));
    info!("✅ Node ready");
    info!("   ├─ History fetcher: {}", role_flags.history_fetcher_enabled);
    info!("   ├─ Token fetcher: {}", rates.is_token_fetcher_enabled());
    info!(
        "   └─ Current rate: {:?}",
        rates.current_exchange_rate().await.fiat_value
    );

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("👋 Shutting down");
        }
        _ = rpc_handle => {
            warn!("⚠️  Peer RPC server stopped");
        }
    }

    Ok(())
}
