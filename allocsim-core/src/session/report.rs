//! Session outputs: the equity curve and the forward-filled allocation table.

use crate::trading::TargetAllocation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// A close recorded on or before the date of the last recorded close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("equity for {date} recorded after {last}; closes must have strictly increasing dates")]
pub struct OutOfOrderEquity {
    pub date: NaiveDate,
    pub last: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Account equity recorded at each retained market close.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquityCurve {
    points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point. Dates must be strictly increasing; one point per day.
    pub fn push(&mut self, date: NaiveDate, equity: f64) -> Result<(), OutOfOrderEquity> {
        if let Some(last) = self.points.last() {
            if date <= last.date {
                return Err(OutOfOrderEquity {
                    date,
                    last: last.date,
                });
            }
        }
        self.points.push(EquityPoint { date, equity });
        Ok(())
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.equity).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&EquityPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&EquityPoint> {
        self.points.last()
    }
}

/// One row of the allocation table; weights follow [`AllocationTable::tickers`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRow {
    pub date: NaiveDate,
    /// `None` before the first rebalance or for a ticker the governing
    /// record did not mention.
    pub weights: Vec<Option<f64>>,
}

/// Target allocations resampled onto the equity curve's dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationTable {
    tickers: Vec<String>,
    rows: Vec<AllocationRow>,
}

impl AllocationTable {
    /// Forward-fill `history` onto the dates of `curve`.
    ///
    /// Each row takes the last record dated on or before it (the last record
    /// of a day wins). Columns are the sorted union of every ticker in
    /// `history`. Rows before `burn_in` are dropped.
    pub fn forward_filled(
        history: &[TargetAllocation],
        curve: &EquityCurve,
        burn_in: Option<NaiveDate>,
    ) -> Self {
        let tickers: Vec<String> = history
            .iter()
            .flat_map(|r| r.weights.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut by_date: BTreeMap<NaiveDate, &TargetAllocation> = BTreeMap::new();
        for record in history {
            by_date.insert(record.timestamp.date_naive(), record);
        }

        let rows = curve
            .points()
            .iter()
            .filter(|p| burn_in.map_or(true, |b| p.date >= b))
            .map(|p| {
                let governing = by_date.range(..=p.date).next_back().map(|(_, r)| *r);
                let weights = tickers
                    .iter()
                    .map(|t| governing.and_then(|r| r.weights.get(t).copied()))
                    .collect();
                AllocationRow {
                    date: p.date,
                    weights,
                }
            })
            .collect();

        Self { tickers, rows }
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn rows(&self) -> &[AllocationRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Weight of `ticker` on `date`, `None` when missing.
    pub fn get(&self, date: NaiveDate, ticker: &str) -> Option<f64> {
        let col = self.tickers.iter().position(|t| t == ticker)?;
        let idx = self.rows.binary_search_by_key(&date, |r| r.date).ok()?;
        self.rows[idx].weights[col]
    }

    /// Column of weights for `ticker`, aligned with [`AllocationTable::rows`].
    pub fn column(&self, ticker: &str) -> Option<Vec<Option<f64>>> {
        let col = self.tickers.iter().position(|t| t == ticker)?;
        Some(self.rows.iter().map(|r| r.weights[col]).collect())
    }
}
