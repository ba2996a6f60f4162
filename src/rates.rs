//! Exchange-rate table, pivot conversion, and the caching rate provider.
//!
//! Every rate is expressed as units of a currency per 1 USD, so converting
//! between two non-USD currencies composes through USD without needing a
//! direct rate between them.

use crate::error::{LedgerError, Result};
use crate::money::Currency;
use chrono::{DateTime, Duration, Utc};
use csv::{ReaderBuilder, Trim};
use log::warn;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use std::str::FromStr;

/// Exchange rates keyed by currency code.
///
/// Only positive rates are stored: a zero rate would erase amounts during
/// conversion and a negative one would flip credit into debt. An absent
/// currency is always reported as [`LedgerError::MissingRate`], never treated
/// as a rate of zero.
#[derive(Debug, Clone)]
pub struct RateTable {
    rates: HashMap<Currency, Decimal>,
}

/// Raw rate row as read from CSV (`currency,rate`).
#[derive(Debug, Deserialize)]
struct RateRecord {
    currency: String,
    rate: Option<String>,
}

impl RateTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        RateTable {
            rates: HashMap::new(),
        }
    }

    /// Inserts a rate, replacing any previous entry for the currency.
    ///
    /// Returns `false` and stores nothing if `per_usd` is not positive.
    pub fn insert(&mut self, currency: Currency, per_usd: Decimal) -> bool {
        if per_usd <= Decimal::ZERO {
            return false;
        }
        self.rates.insert(currency, per_usd);
        true
    }

    /// Looks up the rate for a currency.
    pub fn rate(&self, currency: &Currency) -> Result<Decimal> {
        self.rates
            .get(currency)
            .copied()
            .ok_or_else(|| LedgerError::MissingRate(currency.clone()))
    }

    /// Returns `true` if the table has a rate for `currency`.
    pub fn contains(&self, currency: &Currency) -> bool {
        self.rates.contains_key(currency)
    }

    /// Number of currencies in the table.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Returns `true` if the table holds no rates.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Converts `amount` from one currency into another through the USD
    /// pivot: `amount * rate[to] / rate[from]`.
    ///
    /// Multiplies before dividing so that cross-rates landing on an exact
    /// value (1300 KES at 130 per USD is exactly 10 USD) stay exact.
    pub fn convert(&self, amount: Decimal, from: &Currency, to: &Currency) -> Result<Decimal> {
        let from_rate = self.rate(from)?;
        let to_rate = self.rate(to)?;
        Ok(amount * to_rate / from_rate)
    }

    /// Reads a `currency,rate` CSV.
    ///
    /// Rows with a missing, unparseable, or non-positive rate are logged at
    /// warn level and skipped; a duplicate code replaces the earlier entry.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut table = RateTable::new();

        for (row_idx, result) in csv_reader.deserialize::<RateRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("rates row {}: CSV parse error: {}", row_num, e);
                    continue;
                }
            };

            let currency: Currency = match record.currency.parse() {
                Ok(currency) => currency,
                Err(e) => {
                    warn!("rates row {}: {}", row_num, e);
                    continue;
                }
            };

            let rate_str = match record.rate.as_deref().map(str::trim) {
                Some(s) if !s.is_empty() => s,
                _ => {
                    warn!("rates row {}: missing rate for {}", row_num, currency);
                    continue;
                }
            };

            let per_usd = match Decimal::from_str(rate_str) {
                Ok(per_usd) => per_usd,
                Err(e) => {
                    warn!("rates row {}: bad rate for {}: {}", row_num, currency, e);
                    continue;
                }
            };

            if table.contains(&currency) {
                warn!(
                    "rates row {}: duplicate rate for {}, keeping the newer value",
                    row_num, currency
                );
            }

            let code = currency.clone();
            if !table.insert(currency, per_usd) {
                warn!(
                    "rates row {}: rate for {} must be positive, got {}",
                    row_num, code, per_usd
                );
            }
        }

        Ok(table)
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Where rate tables come from.
///
/// The seam that lets reports run against a file today and a rate service
/// later, and lets tests script refresh failures.
pub trait RateSource {
    /// Produces a fresh table.
    fn fetch(&mut self) -> Result<RateTable>;
}

/// Rate source that re-reads a `currency,rate` CSV file on every fetch.
pub struct CsvRateSource {
    path: PathBuf,
}

impl CsvRateSource {
    /// Creates a source reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvRateSource { path: path.into() }
    }
}

impl RateSource for CsvRateSource {
    fn fetch(&mut self) -> Result<RateTable> {
        let file = File::open(&self.path)?;
        RateTable::from_csv(BufReader::new(file))
    }
}

/// Caches fetched rates and refreshes them once the TTL lapses.
///
/// A failed refresh falls back to the stale table with a warning when one
/// exists; only a failure with no cached table at all reaches the caller.
/// Rates move slowly enough that yesterday's table beats no report.
pub struct CachedRateProvider<S> {
    source: S,
    ttl: Duration,
    cached: Option<CachedTable>,
}

struct CachedTable {
    table: RateTable,
    fetched_at: DateTime<Utc>,
}

impl<S: RateSource> CachedRateProvider<S> {
    /// Creates a provider with the given refresh interval.
    pub fn new(source: S, ttl: Duration) -> Self {
        CachedRateProvider {
            source,
            ttl,
            cached: None,
        }
    }

    /// Provider with the 24-hour TTL the reports use.
    pub fn daily(source: S) -> Self {
        Self::new(source, Duration::hours(24))
    }

    /// Returns the current table, refreshing if the cache has expired.
    pub fn rates(&mut self) -> Result<&RateTable> {
        self.rates_at(Utc::now())
    }

    /// Same as [`rates`](Self::rates) with the clock passed in, so expiry is
    /// testable without waiting out the TTL.
    pub fn rates_at(&mut self, now: DateTime<Utc>) -> Result<&RateTable> {
        let fresh = self
            .cached
            .as_ref()
            .map(|c| now - c.fetched_at < self.ttl)
            .unwrap_or(false);

        if !fresh {
            match self.source.fetch() {
                Ok(table) => {
                    self.cached = Some(CachedTable {
                        table,
                        fetched_at: now,
                    });
                }
                Err(e) if self.cached.is_some() => {
                    warn!("rate refresh failed, using stale rates: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        // Safety: the cache was populated or verified non-empty above
        Ok(&self.cached.as_ref().expect("cached rates exist").table)
    }
}
