//! Exchange-rate and market history records

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Which coin a rate refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// The chain's native coin
    Primary,
    /// The configured secondary coin
    Secondary,
}

impl AssetKind {
    pub fn from_secondary_flag(use_secondary_asset: bool) -> Self {
        if use_secondary_asset {
            AssetKind::Secondary
        } else {
            AssetKind::Primary
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Primary => "primary",
            AssetKind::Secondary => "secondary",
        }
    }
}

/// A priced asset at a point in time
///
/// The null value ([`ExchangeRate::null`]) has every field absent and means
/// "no pricing data available".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub fiat_value: Option<f64>,
    pub market_cap: Option<f64>,
    pub tvl: Option<f64>,
    pub volume_24h: Option<f64>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub image_url: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl ExchangeRate {
    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_null(&self) -> bool {
        *self == Self::null()
    }
}

/// Daily market snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub closing_price: Option<f64>,
    pub opening_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub tvl: Option<f64>,
    pub secondary_coin: bool,
}

impl HistoryPoint {
    /// Historical rate built from closing price, market cap and TVL only
    pub fn to_exchange_rate(&self) -> ExchangeRate {
        ExchangeRate {
            fiat_value: self.closing_price,
            market_cap: self.market_cap,
            tvl: self.tvl,
            ..ExchangeRate::null()
        }
    }
}

/// Options for point-in-time history lookups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryOptions {
    /// Look up the secondary coin's history instead of the primary one
    pub secondary_coin: bool,
}
