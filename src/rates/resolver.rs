//! Exchange-rate read path
//!
//! Every operation degrades to the null rate (or an empty series) instead of
//! failing: a disabled fetcher, missing data and storage errors all look the
//! same to callers.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::source::RateSource;
use super::types::{AssetKind, ExchangeRate, HistoryOptions, HistoryPoint};
use crate::cluster::roles::RoleFlagsCell;

#[derive(Clone)]
pub struct ExchangeRateResolver {
    flags: Arc<RoleFlagsCell>,
    source: Arc<dyn RateSource>,
}

impl ExchangeRateResolver {
    pub fn new(flags: Arc<RoleFlagsCell>, source: Arc<dyn RateSource>) -> Self {
        Self { flags, source }
    }

    /// Recent daily history; empty while the history fetcher is disabled
    pub async fn fetch_recent_history(&self, use_secondary_asset: bool) -> Vec<HistoryPoint> {
        if !self.flags.is_history_fetcher_enabled() {
            return Vec::new();
        }

        match self.source.recent_history(use_secondary_asset).await {
            Ok(points) => points,
            Err(e) => {
                log::warn!("⚠️  Recent history lookup failed: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn current_exchange_rate(&self) -> ExchangeRate {
        self.current_rate(AssetKind::Primary).await
    }

    pub async fn secondary_exchange_rate(&self) -> ExchangeRate {
        self.current_rate(AssetKind::Secondary).await
    }

    /// Latest rate for `kind`
    ///
    /// Storage is not consulted at all while the history fetcher is disabled.
    pub async fn current_rate(&self, kind: AssetKind) -> ExchangeRate {
        if !self.flags.is_history_fetcher_enabled() {
            return ExchangeRate::null();
        }

        match self.source.current_rate(kind).await {
            Ok(Some(rate)) => rate,
            Ok(None) => ExchangeRate::null(),
            Err(e) => {
                log::warn!("⚠️  Current {} rate lookup failed: {}", kind.as_str(), e);
                ExchangeRate::null()
            }
        }
    }

    /// Historical rate for the UTC calendar date of `datetime`
    ///
    /// Not gated by the fetcher flags. Only fiat value, market cap and TVL
    /// are filled in.
    pub async fn exchange_rate_at_date(
        &self,
        datetime: Option<DateTime<Utc>>,
        options: &HistoryOptions,
    ) -> ExchangeRate {
        let Some(datetime) = datetime else {
            return ExchangeRate::null();
        };
        let date = datetime.date_naive();

        match self.source.history_at_date(date, options).await {
            Ok(Some(point)) => point.to_exchange_rate(),
            Ok(None) => ExchangeRate::null(),
            Err(e) => {
                log::warn!("⚠️  History lookup for {} failed: {}", date, e);
                ExchangeRate::null()
            }
        }
    }

    pub fn is_token_fetcher_enabled(&self) -> bool {
        self.flags.is_token_fetcher_enabled()
    }

    pub fn is_history_fetcher_enabled(&self) -> bool {
        self.flags.is_history_fetcher_enabled()
    }
}
