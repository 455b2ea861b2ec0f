//! Allocation: a validated, immutable ticker → weight mapping.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Absolute tolerance for the weights-sum-to-one check.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Reasons an allocation is rejected at construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocationError {
    #[error("allocation must contain at least one ticker")]
    Empty,

    #[error("weight for '{ticker}' must be greater than zero (got {weight})")]
    NonPositiveWeight { ticker: String, weight: f64 },

    #[error("weights must sum to 1 (got {sum})")]
    WeightSumMismatch { sum: f64 },

    #[error("ticker '{0}' appears more than once")]
    DuplicateTicker(String),
}

/// Static ticker → weight allocation.
///
/// Every instance satisfies: at least one ticker, every weight strictly
/// positive, weights summing to 1 within [`WEIGHT_SUM_TOLERANCE`]. Tickers keep
/// the order they were supplied in. There is no mutation API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, f64>",
    into = "BTreeMap<String, f64>"
)]
pub struct Allocation {
    entries: Vec<(String, f64)>,
}

impl Allocation {
    /// Validate and build an allocation. Never clamps or renormalizes.
    pub fn new<I, S>(pairs: I) -> Result<Self, AllocationError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut entries: Vec<(String, f64)> = Vec::new();
        for (ticker, weight) in pairs {
            let ticker = ticker.into();
            if entries.iter().any(|(t, _)| *t == ticker) {
                return Err(AllocationError::DuplicateTicker(ticker));
            }
            entries.push((ticker, weight));
        }

        if entries.is_empty() {
            return Err(AllocationError::Empty);
        }

        // `!(w > 0.0)` also rejects NaN
        if let Some((ticker, weight)) = entries.iter().find(|(_, w)| !(*w > 0.0)) {
            return Err(AllocationError::NonPositiveWeight {
                ticker: ticker.clone(),
                weight: *weight,
            });
        }

        let sum: f64 = entries.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() >= WEIGHT_SUM_TOLERANCE {
            return Err(AllocationError::WeightSumMismatch { sum });
        }

        Ok(Self { entries })
    }

    /// Tickers in construction order.
    pub fn tickers(&self) -> Vec<&str> {
        self.entries.iter().map(|(t, _)| t.as_str()).collect()
    }

    /// Weights in the same order as [`Allocation::tickers`].
    pub fn weights(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, w)| *w).collect()
    }

    /// Weight for a ticker, `None` if the ticker is not part of the allocation.
    pub fn weight(&self, ticker: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(t, _)| t == ticker)
            .map(|(_, w)| *w)
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.weight(ticker).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed allocation.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over tickers.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    /// Iterate over `(ticker, weight)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(t, w)| (t.as_str(), *w))
    }

    /// Copy into a sorted map, the shape target allocations are recorded in.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.entries.iter().cloned().collect()
    }
}

impl TryFrom<BTreeMap<String, f64>> for Allocation {
    type Error = AllocationError;

    fn try_from(map: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        Self::new(map)
    }
}

impl From<Allocation> for BTreeMap<String, f64> {
    fn from(allocation: Allocation) -> Self {
        allocation.entries.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a Allocation {
    type Item = (&'a str, f64);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, f64)>,
        fn(&'a (String, f64)) -> (&'a str, f64),
    >;

    fn into_iter(self) -> Self::IntoIter {
        fn project(entry: &(String, f64)) -> (&str, f64) {
            (entry.0.as_str(), entry.1)
        }
        self.entries.iter().map(project as fn(&'a (String, f64)) -> (&'a str, f64))
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Allocation(")?;
        for (i, (ticker, weight)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ticker}={weight}")?;
        }
        write!(f, ")")
    }
}
