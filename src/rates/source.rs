//! Rate lookups and the fallback chain
//!
//! A [`RateSource`] answers current-rate and history queries. Sources are
//! layered with [`ChainedRateSource`]: the in-process cache first, then the
//! database, first hit wins.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::types::{AssetKind, ExchangeRate, HistoryOptions, HistoryPoint};

pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Lookup of stored exchange-rate data
///
/// `Ok(None)` / an empty vec mean "no data"; `Err` is a storage failure.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn current_rate(&self, kind: AssetKind) -> Result<Option<ExchangeRate>, SourceError>;

    async fn history_at_date(
        &self,
        date: NaiveDate,
        options: &HistoryOptions,
    ) -> Result<Option<HistoryPoint>, SourceError>;

    /// Recent daily history, oldest first
    async fn recent_history(&self, secondary_coin: bool) -> Result<Vec<HistoryPoint>, SourceError>;
}

/// In-process rate cache, written by the fetchers
#[derive(Debug, Default)]
pub struct MemoryRateStore {
    current: RwLock<HashMap<AssetKind, ExchangeRate>>,
    history: RwLock<BTreeMap<(bool, NaiveDate), HistoryPoint>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_current_rate(&self, kind: AssetKind, rate: ExchangeRate) {
        self.current.write().await.insert(kind, rate);
    }

    /// Insert or replace the point for its date and coin
    pub async fn put_history(&self, point: HistoryPoint) {
        self.history
            .write()
            .await
            .insert((point.secondary_coin, point.date), point);
    }
}

#[async_trait]
impl RateSource for MemoryRateStore {
    async fn current_rate(&self, kind: AssetKind) -> Result<Option<ExchangeRate>, SourceError> {
        Ok(self.current.read().await.get(&kind).cloned())
    }

    async fn history_at_date(
        &self,
        date: NaiveDate,
        options: &HistoryOptions,
    ) -> Result<Option<HistoryPoint>, SourceError> {
        Ok(self
            .history
            .read()
            .await
            .get(&(options.secondary_coin, date))
            .cloned())
    }

    async fn recent_history(&self, secondary_coin: bool) -> Result<Vec<HistoryPoint>, SourceError> {
        Ok(self
            .history
            .read()
            .await
            .range((secondary_coin, NaiveDate::MIN)..=(secondary_coin, NaiveDate::MAX))
            .map(|(_, point)| point.clone())
            .collect())
    }
}

/// Ordered fallback over several sources
///
/// A failing source is logged and skipped.
#[derive(Clone, Default)]
pub struct ChainedRateSource {
    sources: Vec<Arc<dyn RateSource>>,
}

impl ChainedRateSource {
    pub fn new(sources: Vec<Arc<dyn RateSource>>) -> Self {
        Self { sources }
    }

    pub fn push(mut self, source: Arc<dyn RateSource>) -> Self {
        self.sources.push(source);
        self
    }
}

#[async_trait]
impl RateSource for ChainedRateSource {
    async fn current_rate(&self, kind: AssetKind) -> Result<Option<ExchangeRate>, SourceError> {
        for (i, source) in self.sources.iter().enumerate() {
            match source.current_rate(kind).await {
                Ok(Some(rate)) => return Ok(Some(rate)),
                Ok(None) => continue,
                Err(e) => log::warn!("⚠️  Rate source #{} failed ({} rate): {}", i, kind.as_str(), e),
            }
        }
        Ok(None)
    }

    async fn history_at_date(
        &self,
        date: NaiveDate,
        options: &HistoryOptions,
    ) -> Result<Option<HistoryPoint>, SourceError> {
        for (i, source) in self.sources.iter().enumerate() {
            match source.history_at_date(date, options).await {
                Ok(Some(point)) => return Ok(Some(point)),
                Ok(None) => continue,
                Err(e) => log::warn!("⚠️  Rate source #{} failed (history {}): {}", i, date, e),
            }
        }
        Ok(None)
    }

    async fn recent_history(&self, secondary_coin: bool) -> Result<Vec<HistoryPoint>, SourceError> {
        for (i, source) in self.sources.iter().enumerate() {
            match source.recent_history(secondary_coin).await {
                Ok(points) if !points.is_empty() => return Ok(points),
                Ok(_) => continue,
                Err(e) => log::warn!("⚠️  Rate source #{} failed (recent history): {}", i, e),
            }
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenSource;

    #[async_trait]
    impl RateSource for BrokenSource {
        async fn current_rate(&self, _kind: AssetKind) -> Result<Option<ExchangeRate>, SourceError> {
            Err("database is locked".into())
        }

        async fn history_at_date(
            &self,
            _date: NaiveDate,
            _options: &HistoryOptions,
        ) -> Result<Option<HistoryPoint>, SourceError> {
            Err("database is locked".into())
        }

        async fn recent_history(&self, _secondary_coin: bool) -> Result<Vec<HistoryPoint>, SourceError> {
            Err("database is locked".into())
        }
    }

    fn point(day: u32, secondary_coin: bool, close: f64) -> HistoryPoint {
        HistoryPoint {
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            closing_price: Some(close),
            opening_price: None,
            market_cap: None,
            tvl: None,
            secondary_coin,
        }
    }

    #[tokio::test]
    async fn test_memory_store_separates_coins() {
        let store = MemoryRateStore::new();
        store.put_history(point(2, false, 10.0)).await;
        store.put_history(point(1, false, 9.0)).await;
        store.put_history(point(1, true, 0.5)).await;

        let primary = store.recent_history(false).await.unwrap();
        assert_eq!(primary.len(), 2);
        assert_eq!(primary[0].closing_price, Some(9.0)); // oldest first

        let secondary = store
            .history_at_date(
                NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                &HistoryOptions { secondary_coin: true },
            )
            .await
            .unwrap();
        assert_eq!(secondary.unwrap().closing_price, Some(0.5));
    }

    #[tokio::test]
    async fn test_chain_falls_through_to_next_source() {
        let cache = Arc::new(MemoryRateStore::new());
        let db = Arc::new(MemoryRateStore::new());
        db.put_current_rate(
            AssetKind::Primary,
            ExchangeRate {
                fiat_value: Some(1.25),
                ..ExchangeRate::null()
            },
        )
        .await;

        let chain = ChainedRateSource::default().push(cache.clone()).push(db);
        let rate = chain.current_rate(AssetKind::Primary).await.unwrap().unwrap();
        assert_eq!(rate.fiat_value, Some(1.25));

        // The first source wins once it has data
        cache
            .put_current_rate(
                AssetKind::Primary,
                ExchangeRate {
                    fiat_value: Some(1.30),
                    ..ExchangeRate::null()
                },
            )
            .await;
        let rate = chain.current_rate(AssetKind::Primary).await.unwrap().unwrap();
        assert_eq!(rate.fiat_value, Some(1.30));
    }

    #[tokio::test]
    async fn test_chain_skips_failing_source() {
        let db = Arc::new(MemoryRateStore::new());
        db.put_history(point(3, false, 42.0)).await;

        let chain = ChainedRateSource::default()
            .push(Arc::new(BrokenSource))
            .push(db);

        assert_eq!(chain.recent_history(false).await.unwrap().len(), 1);
        assert!(chain.current_rate(AssetKind::Secondary).await.unwrap().is_none());
    }
}
