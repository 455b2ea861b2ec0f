//! Price data: daily bars and the point-in-time price lookup the broker uses.
//!
//! Pricing rule for an instant `ts` on date `d`:
//! - no bar on `d`: adjusted close of the latest bar before `d`
//! - `ts` before the 14:30 open: adjusted close of the previous bar
//! - `ts` before the 21:00 close: adjusted open of the bar on `d`
//! - otherwise: adjusted close of the bar on `d`
//!
//! Adjustment scales raw prices by `adj_close / close`, so dividends and
//! splits are reflected the same way in open and close prices.

pub mod csv_source;

pub use csv_source::{load_csv_dir, read_csv_bars, resolve_csv_dir, CSV_DATA_DIR_ENV};

use crate::domain::Timestamp;
use crate::exchange::{market_close_time, market_open_time};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("no CSV file for '{ticker}' at {}", path.display())]
    MissingFile { ticker: String, path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("no usable bars for '{ticker}'")]
    EmptySeries { ticker: String },

    #[error("invalid bar for '{ticker}' on {date}: {reason}")]
    InvalidBar {
        ticker: String,
        date: NaiveDate,
        reason: String,
    },
}

/// Point-in-time price source.
pub trait DataHandler: Send {
    /// Price of `asset` as known at `ts`; `None` when nothing is known yet.
    fn latest_price(&self, asset: &str, ts: Timestamp) -> Option<f64>;

    /// Assets with data available.
    fn assets(&self) -> Vec<String>;
}

/// One daily OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: f64,
}

impl DailyBar {
    /// Bar with every price equal to `price`.
    pub fn flat(date: NaiveDate, price: f64) -> Self {
        Self {
            date,
            open: price,
            high: price,
            low: price,
            close: price,
            adj_close: price,
            volume: 0.0,
        }
    }

    fn adjustment(&self) -> f64 {
        if self.close > 0.0 {
            self.adj_close / self.close
        } else {
            1.0
        }
    }

    pub fn adjusted_open(&self) -> f64 {
        self.open * self.adjustment()
    }

    pub fn adjusted_close(&self) -> f64 {
        self.adj_close
    }

    fn validate(&self, ticker: &str) -> Result<(), DataError> {
        let prices = [self.open, self.high, self.low, self.close, self.adj_close];
        if prices.iter().any(|p| !(p.is_finite() && *p > 0.0)) {
            return Err(DataError::InvalidBar {
                ticker: ticker.to_string(),
                date: self.date,
                reason: "prices must be positive and finite".into(),
            });
        }
        if self.high < self.low {
            return Err(DataError::InvalidBar {
                ticker: ticker.to_string(),
                date: self.date,
                reason: format!("high {} below low {}", self.high, self.low),
            });
        }
        Ok(())
    }
}

/// Date-ordered bars for one asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarSeries {
    bars: Vec<DailyBar>,
}

impl BarSeries {
    /// Sort by date; a later bar for the same date replaces an earlier one.
    pub fn new(mut bars: Vec<DailyBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        let mut deduped: Vec<DailyBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }
        Self { bars: deduped }
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Price known at `ts` under the module pricing rule.
    pub fn price_at(&self, ts: Timestamp) -> Option<f64> {
        let date = ts.date_naive();
        let time = ts.time();
        match self.bars.binary_search_by_key(&date, |b| b.date) {
            Ok(idx) => {
                let bar = &self.bars[idx];
                if time >= market_close_time() {
                    Some(bar.adjusted_close())
                } else if time >= market_open_time() {
                    Some(bar.adjusted_open())
                } else {
                    idx.checked_sub(1).map(|prev| self.bars[prev].adjusted_close())
                }
            }
            Err(idx) => idx.checked_sub(1).map(|prev| self.bars[prev].adjusted_close()),
        }
    }
}

/// In-memory data handler keyed by asset.
#[derive(Debug, Clone, Default)]
pub struct BarDataHandler {
    series: BTreeMap<String, BarSeries>,
}

impl BarDataHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the bars for `asset` after validating each bar.
    pub fn insert_bars(
        &mut self,
        asset: impl Into<String>,
        bars: Vec<DailyBar>,
    ) -> Result<(), DataError> {
        let asset = asset.into();
        for bar in &bars {
            bar.validate(&asset)?;
        }
        if bars.is_empty() {
            return Err(DataError::EmptySeries { ticker: asset });
        }
        self.series.insert(asset, BarSeries::new(bars));
        Ok(())
    }

    /// Builder-style [`BarDataHandler::insert_bars`].
    pub fn with_bars(
        mut self,
        asset: impl Into<String>,
        bars: Vec<DailyBar>,
    ) -> Result<Self, DataError> {
        self.insert_bars(asset, bars)?;
        Ok(self)
    }

    pub fn series(&self, asset: &str) -> Option<&BarSeries> {
        self.series.get(asset)
    }
}

impl DataHandler for BarDataHandler {
    fn latest_price(&self, asset: &str, ts: Timestamp) -> Option<f64> {
        self.series.get(asset)?.price_at(ts)
    }

    fn assets(&self) -> Vec<String> {
        self.series.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bar(d: NaiveDate, open: f64, close: f64, adj_close: f64) -> DailyBar {
        DailyBar {
            date: d,
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            adj_close,
            volume: 1_000.0,
        }
    }

    fn handler() -> BarDataHandler {
        BarDataHandler::new()
            .with_bars(
                "SPY",
                vec![
                    bar(date(2024, 1, 2), 100.0, 102.0, 102.0),
                    bar(date(2024, 1, 3), 103.0, 104.0, 52.0),
                ],
            )
            .unwrap()
    }

    #[test]
    fn open_and_close_prices() {
        let h = handler();
        let open = Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap();
        let close = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();
        assert_eq!(h.latest_price("SPY", open), Some(100.0));
        assert_eq!(h.latest_price("SPY", close), Some(102.0));
    }

    #[test]
    fn adjustment_scales_open() {
        let h = handler();
        let open = Utc.with_ymd_and_hms(2024, 1, 3, 14, 30, 0).unwrap();
        // adj/close = 0.5
        assert_eq!(h.latest_price("SPY", open), Some(51.5));
    }

    #[test]
    fn pre_market_uses_previous_close() {
        let h = handler();
        let pre = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        assert_eq!(h.latest_price("SPY", pre), Some(102.0));
        let first_pre = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(h.latest_price("SPY", first_pre), None);
    }

    #[test]
    fn missing_day_carries_last_close() {
        let h = handler();
        let later = Utc.with_ymd_and_hms(2024, 1, 8, 14, 30, 0).unwrap();
        assert_eq!(h.latest_price("SPY", later), Some(52.0));
        let before = Utc.with_ymd_and_hms(2023, 12, 29, 21, 0, 0).unwrap();
        assert_eq!(h.latest_price("SPY", before), None);
        assert_eq!(h.latest_price("QQQ", later), None);
    }

    #[test]
    fn series_sorts_and_dedups() {
        let series = BarSeries::new(vec![
            DailyBar::flat(date(2024, 1, 3), 2.0),
            DailyBar::flat(date(2024, 1, 2), 1.0),
            DailyBar::flat(date(2024, 1, 3), 3.0),
        ]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.first_date(), Some(date(2024, 1, 2)));
        assert_eq!(series.bars()[1].close, 3.0);
    }

    #[test]
    fn invalid_bars_are_rejected() {
        let mut h = BarDataHandler::new();
        let err = h
            .insert_bars("X", vec![DailyBar::flat(date(2024, 1, 2), -1.0)])
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidBar { .. }));
        assert!(matches!(
            h.insert_bars("X", vec![]),
            Err(DataError::EmptySeries { .. })
        ));
    }
}
