//! Integration tests for fetcher discovery and the exchange-rate read path
//!
//! Discovery runs on a paused tokio clock so the backoff schedule can be
//! checked exactly without real sleeping.

#[cfg(test)]
mod discovery_integration_tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use priceflow::cluster::{
        ClusterMembership, DiscoveryConfig, DiscoveryError, DiscoveryLoop, FetcherLiveness,
        NodeRole, PeerNode, RemoteError, RemoteInvoker, RemoteOperation, RemoteReply, RoleFlags,
        RoleFlagsCell,
    };
    use priceflow::rates::{ExchangeRateResolver, HistoryOptions, HistoryPoint, MemoryRateStore};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;

    /// Returns scripted peer lists and records when each listing happened
    struct ScriptedMembership {
        started: Instant,
        script: Mutex<VecDeque<Vec<PeerNode>>>,
        calls: Mutex<Vec<Duration>>,
    }

    impl ScriptedMembership {
        fn new(script: Vec<Vec<PeerNode>>) -> Self {
            Self {
                started: Instant::now(),
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_offsets_secs(&self) -> Vec<u64> {
            self.calls.lock().unwrap().iter().map(|d| d.as_secs()).collect()
        }
    }

    #[async_trait]
    impl ClusterMembership for ScriptedMembership {
        async fn list_peers(&self) -> Vec<PeerNode> {
            self.calls.lock().unwrap().push(self.started.elapsed());
            self.script.lock().unwrap().pop_front().unwrap_or_default()
        }
    }

    enum Behavior {
        Reply(FetcherLiveness),
        Fail,
        Hang,
    }

    struct MockInvoker {
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl MockInvoker {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RemoteInvoker for MockInvoker {
        async fn invoke(
            &self,
            peer: &PeerNode,
            _operation: RemoteOperation,
        ) -> Result<RemoteReply, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Reply(liveness) => Ok(RemoteReply::FetcherLiveness(*liveness)),
                Behavior::Fail => Err(RemoteError::Unreachable {
                    peer: peer.name.clone(),
                    reason: "connection refused".to_string(),
                }),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!("call should have timed out")
                }
            }
        }
    }

    fn indexer(name: &str) -> PeerNode {
        PeerNode::new(name, format!("{}:4010", name), NodeRole::Indexer)
    }

    fn api(name: &str) -> PeerNode {
        PeerNode::new(name, format!("{}:4010", name), NodeRole::Api)
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_indexer_fails_after_five_doubling_attempts() {
        let membership = Arc::new(ScriptedMembership::new(vec![]));
        let invoker = MockInvoker::new(Behavior::Reply(FetcherLiveness::default()));
        let flags = Arc::new(RoleFlagsCell::new());

        let discovery = DiscoveryLoop::new(
            membership.clone(),
            invoker.clone(),
            flags.clone(),
            DiscoveryConfig::default(),
        );

        let started = Instant::now();
        let result = discovery.run().await;

        assert_eq!(result, Err(DiscoveryError::NoIndexerFound { attempts: 5 }));
        // Delays 1, 2, 4, 8, 16 seconds
        assert_eq!(membership.call_offsets_secs(), vec![1, 3, 7, 15, 31]);
        assert_eq!(started.elapsed(), Duration::from_secs(31));
        assert_eq!(invoker.calls.load(Ordering::SeqCst), 0);
        assert!(!flags.is_resolved());
    }

    #[tokio::test(start_paused = true)]
    async fn test_indexer_appearing_late_is_found() {
        let membership = Arc::new(ScriptedMembership::new(vec![
            vec![],
            vec![api("web-2")],
            vec![api("web-2"), indexer("indexer-a")],
        ]));
        let invoker = MockInvoker::new(Behavior::Reply(FetcherLiveness {
            history: true,
            token: true,
        }));
        let flags = Arc::new(RoleFlagsCell::new());

        let result = DiscoveryLoop::new(membership.clone(), invoker, flags.clone(), DiscoveryConfig::default())
            .run()
            .await;

        assert_eq!(result, Ok(RoleFlags::new(true, true)));
        assert_eq!(membership.call_offsets_secs(), vec![1, 3, 7]);
        assert_eq!(flags.get(), Some(RoleFlags::new(true, true)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_multiple_indexers_fail_without_retry() {
        let membership = Arc::new(ScriptedMembership::new(vec![vec![
            indexer("indexer-a"),
            api("web-1"),
            indexer("indexer-b"),
        ]]));
        let invoker = MockInvoker::new(Behavior::Reply(FetcherLiveness::default()));
        let flags = Arc::new(RoleFlagsCell::new());

        let result = DiscoveryLoop::new(membership.clone(), invoker.clone(), flags.clone(), DiscoveryConfig::default())
            .run()
            .await;

        assert_eq!(
            result,
            Err(DiscoveryError::AmbiguousIndexers {
                peers: vec!["indexer-a".to_string(), "indexer-b".to_string()],
            })
        );
        assert_eq!(membership.call_offsets_secs(), vec![1]);
        assert_eq!(invoker.calls.load(Ordering::SeqCst), 0);
        assert!(!flags.is_resolved());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_resolves_to_disabled() {
        let membership = Arc::new(ScriptedMembership::new(vec![vec![indexer("indexer-a")]]));
        let flags = Arc::new(RoleFlagsCell::new());

        let result = DiscoveryLoop::new(
            membership,
            MockInvoker::new(Behavior::Fail),
            flags.clone(),
            DiscoveryConfig::default(),
        )
        .run()
        .await;

        assert_eq!(result, Ok(RoleFlags::disabled()));
        assert_eq!(flags.get(), Some(RoleFlags::disabled()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_remote_call_times_out_to_disabled() {
        let membership = Arc::new(ScriptedMembership::new(vec![vec![indexer("indexer-a")]]));
        let flags = Arc::new(RoleFlagsCell::new());
        let config = DiscoveryConfig {
            remote_call_timeout: Duration::from_secs(2),
            ..Default::default()
        };

        let started = Instant::now();
        let result = DiscoveryLoop::new(membership, MockInvoker::new(Behavior::Hang), flags.clone(), config)
            .run()
            .await;

        assert_eq!(result, Ok(RoleFlags::disabled()));
        // 1s attempt delay plus the 2s call bound
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert!(flags.is_resolved());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_indexer_history_only_scenario() {
        let membership = Arc::new(ScriptedMembership::new(vec![vec![indexer("indexer-a")]]));
        let invoker = MockInvoker::new(Behavior::Reply(FetcherLiveness {
            history: true,
            token: false,
        }));
        let flags = Arc::new(RoleFlagsCell::new());

        let store = Arc::new(MemoryRateStore::new());
        let today = Utc::now().date_naive();
        store
            .put_history(HistoryPoint {
                date: today,
                closing_price: Some(1.0),
                opening_price: Some(0.98),
                market_cap: Some(1e9),
                tvl: None,
                secondary_coin: false,
            })
            .await;

        let rates = ExchangeRateResolver::new(flags.clone(), store);

        // Before discovery completes reads are gated off
        assert!(rates.fetch_recent_history(false).await.is_empty());

        let handle = DiscoveryLoop::new(membership, invoker, flags.clone(), DiscoveryConfig::default()).spawn();
        let resolved = handle.await.unwrap().unwrap();

        assert_eq!(resolved, RoleFlags::new(true, false));
        assert_eq!(rates.fetch_recent_history(false).await.len(), 1);
        assert!(!rates.is_token_fetcher_enabled());

        // Historical lookups never depended on the flags
        let at = today.and_hms_opt(12, 0, 0).unwrap().and_utc();
        let rate = rates
            .exchange_rate_at_date(Some(at), &HistoryOptions::default())
            .await;
        assert_eq!(rate.fiat_value, Some(1.0));
        assert_eq!(rate.market_cap, Some(1e9));
        assert!(rate.symbol.is_none());
    }
}
