//! Signals refreshed once per trading day at market close.

use crate::data::DataHandler;
use crate::domain::{StaticUniverse, Timestamp};
use std::collections::{BTreeMap, VecDeque};

/// A collection of per-asset signals updated by the session.
pub trait SignalsCollection: Send {
    /// Pull the latest data at `ts` (called on market-close events).
    fn update(&mut self, ts: Timestamp, data: &dyn DataHandler);

    /// Current value for `asset`, `None` until enough history exists.
    fn signal(&self, asset: &str) -> Option<f64>;

    fn name(&self) -> &str;
}

/// Trailing total return over a fixed number of closes.
///
/// Keeps `lookback + 1` closes per asset, so `signal` becomes available after
/// the window fills.
#[derive(Debug, Clone)]
pub struct MomentumSignals {
    universe: StaticUniverse,
    lookback: usize,
    closes: BTreeMap<String, VecDeque<f64>>,
}

impl MomentumSignals {
    pub fn new(universe: StaticUniverse, lookback: usize) -> Self {
        let lookback = lookback.max(1);
        let closes = universe
            .assets()
            .iter()
            .map(|a| (a.clone(), VecDeque::with_capacity(lookback + 1)))
            .collect();
        Self {
            universe,
            lookback,
            closes,
        }
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Return over the last `lookback` closes (at most the configured window).
    pub fn momentum(&self, asset: &str, lookback: usize) -> Option<f64> {
        let window = self.closes.get(asset)?;
        if lookback == 0 || lookback >= window.len() {
            return None;
        }
        let last = *window.back()?;
        let base = window[window.len() - 1 - lookback];
        if base > 0.0 {
            Some(last / base - 1.0)
        } else {
            None
        }
    }
}

impl SignalsCollection for MomentumSignals {
    fn update(&mut self, ts: Timestamp, data: &dyn DataHandler) {
        let capacity = self.lookback + 1;
        for asset in self.universe.assets() {
            let Some(price) = data.latest_price(asset, ts) else {
                continue;
            };
            let window = self.closes.entry(asset.clone()).or_default();
            window.push_back(price);
            while window.len() > capacity {
                window.pop_front();
            }
        }
    }

    fn signal(&self, asset: &str) -> Option<f64> {
        self.momentum(asset, self.lookback)
    }

    fn name(&self) -> &str {
        "momentum"
    }
}
