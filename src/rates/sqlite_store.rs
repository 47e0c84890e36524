//! SQLite-backed rate storage
//!
//! Tables (see `/sql/`):
//! - `exchange_rates` - UPSERT on asset (latest rate per coin)
//! - `market_history` - UPSERT on (date, secondary_coin)

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{types::Type, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

use super::source::{RateSource, SourceError};
use super::types::{AssetKind, ExchangeRate, HistoryOptions, HistoryPoint};

const SCHEMA: [(&str, &str); 2] = [
    ("01_exchange_rates.sql", include_str!("../../sql/01_exchange_rates.sql")),
    ("02_market_history.sql", include_str!("../../sql/02_market_history.sql")),
];

/// Days returned by [`RateSource::recent_history`]
pub const DEFAULT_RECENT_DAYS: i64 = 30;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Create tables if missing and enable WAL mode
pub fn run_schema_migrations(conn: &Connection) -> Result<(), SourceError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;

    for (name, sql) in SCHEMA {
        log::debug!("   ├─ Executing: {}", name);
        conn.execute_batch(sql)?;
    }

    log::info!("✅ Rate store schema ready");
    Ok(())
}

pub struct SqliteRateStore {
    conn: Arc<Mutex<Connection>>,
    recent_days: i64,
}

impl SqliteRateStore {
    /// Open (or create) the database at `db_path` and apply the schema
    pub fn open(db_path: &str) -> Result<Self, SourceError> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, SourceError> {
        run_schema_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            recent_days: DEFAULT_RECENT_DAYS,
        })
    }

    pub fn with_recent_days(mut self, days: i64) -> Self {
        self.recent_days = days;
        self
    }

    /// Insert or replace the latest rate for `kind`
    pub fn upsert_current_rate(&self, kind: AssetKind, rate: &ExchangeRate) -> Result<(), SourceError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO exchange_rates
                (asset, fiat_value, market_cap, tvl, volume_24h, name, symbol, image_url, last_updated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(asset) DO UPDATE SET
                fiat_value = excluded.fiat_value,
                market_cap = excluded.market_cap,
                tvl = excluded.tvl,
                volume_24h = excluded.volume_24h,
                name = excluded.name,
                symbol = excluded.symbol,
                image_url = excluded.image_url,
                last_updated = excluded.last_updated
            "#,
            rusqlite::params![
                kind.as_str(),
                rate.fiat_value,
                rate.market_cap,
                rate.tvl,
                rate.volume_24h,
                rate.name,
                rate.symbol,
                rate.image_url,
                rate.last_updated.map(|t| t.timestamp()),
            ],
        )?;
        Ok(())
    }

    /// Insert or replace the daily point for its date and coin
    pub fn upsert_history(&self, point: &HistoryPoint) -> Result<(), SourceError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO market_history
                (date, secondary_coin, closing_price, opening_price, market_cap, tvl)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(date, secondary_coin) DO UPDATE SET
                closing_price = excluded.closing_price,
                opening_price = excluded.opening_price,
                market_cap = excluded.market_cap,
                tvl = excluded.tvl
            "#,
            rusqlite::params![
                point.date.format(DATE_FORMAT).to_string(),
                point.secondary_coin,
                point.closing_price,
                point.opening_price,
                point.market_cap,
                point.tvl,
            ],
        )?;
        Ok(())
    }

    /// Points on or after `since`, oldest first
    pub fn history_since(&self, since: NaiveDate, secondary_coin: bool) -> Result<Vec<HistoryPoint>, SourceError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT date, secondary_coin, closing_price, opening_price, market_cap, tvl
             FROM market_history
             WHERE secondary_coin = ?1 AND date >= ?2
             ORDER BY date ASC",
        )?;

        let points = stmt
            .query_map(
                rusqlite::params![secondary_coin, since.format(DATE_FORMAT).to_string()],
                history_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(points)
    }
}

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryPoint> {
    let date: String = row.get(0)?;
    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

    Ok(HistoryPoint {
        date,
        secondary_coin: row.get(1)?,
        closing_price: row.get(2)?,
        opening_price: row.get(3)?,
        market_cap: row.get(4)?,
        tvl: row.get(5)?,
    })
}

fn rate_from_row(row: &Row<'_>) -> rusqlite::Result<ExchangeRate> {
    let last_updated: Option<i64> = row.get(7)?;
    Ok(ExchangeRate {
        fiat_value: row.get(0)?,
        market_cap: row.get(1)?,
        tvl: row.get(2)?,
        volume_24h: row.get(3)?,
        name: row.get(4)?,
        symbol: row.get(5)?,
        image_url: row.get(6)?,
        last_updated: last_updated.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
    })
}

#[async_trait]
impl RateSource for SqliteRateStore {
    async fn current_rate(&self, kind: AssetKind) -> Result<Option<ExchangeRate>, SourceError> {
        let conn = self.conn.lock().unwrap();
        let rate = conn
            .query_row(
                "SELECT fiat_value, market_cap, tvl, volume_24h, name, symbol, image_url, last_updated
                 FROM exchange_rates WHERE asset = ?1",
                [kind.as_str()],
                rate_from_row,
            )
            .optional()?;
        Ok(rate)
    }

    async fn history_at_date(
        &self,
        date: NaiveDate,
        options: &HistoryOptions,
    ) -> Result<Option<HistoryPoint>, SourceError> {
        let conn = self.conn.lock().unwrap();
        let point = conn
            .query_row(
                "SELECT date, secondary_coin, closing_price, opening_price, market_cap, tvl
                 FROM market_history WHERE date = ?1 AND secondary_coin = ?2",
                rusqlite::params![date.format(DATE_FORMAT).to_string(), options.secondary_coin],
                history_from_row,
            )
            .optional()?;
        Ok(point)
    }

    async fn recent_history(&self, secondary_coin: bool) -> Result<Vec<HistoryPoint>, SourceError> {
        let since = Utc::now().date_naive() - Duration::days(self.recent_days);
        self.history_since(since, secondary_coin)
    }
}
