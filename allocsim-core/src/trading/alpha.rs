//! Alpha models: per-asset signal weights at a rebalance instant.

use crate::domain::{Allocation, StaticUniverse, Timestamp};
use crate::signals::SignalsCollection;
use std::collections::BTreeMap;

/// Produces raw (unnormalized) weights for the universe.
pub trait AlphaModel: Send {
    fn signals(
        &mut self,
        ts: Timestamp,
        universe: &StaticUniverse,
        signals: Option<&dyn SignalsCollection>,
    ) -> BTreeMap<String, f64>;

    fn name(&self) -> &str;
}

/// Fixed weights taken from a static allocation.
#[derive(Debug, Clone)]
pub struct FixedSignalsAlphaModel {
    allocation: Allocation,
}

impl FixedSignalsAlphaModel {
    pub fn new(allocation: Allocation) -> Self {
        Self { allocation }
    }

    pub fn allocation(&self) -> &Allocation {
        &self.allocation
    }
}

impl AlphaModel for FixedSignalsAlphaModel {
    fn signals(
        &mut self,
        _ts: Timestamp,
        _universe: &StaticUniverse,
        _signals: Option<&dyn SignalsCollection>,
    ) -> BTreeMap<String, f64> {
        self.allocation.to_map()
    }

    fn name(&self) -> &str {
        "fixed_signals"
    }
}

/// Same weight for every universe asset.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualWeightAlphaModel;

impl AlphaModel for EqualWeightAlphaModel {
    fn signals(
        &mut self,
        _ts: Timestamp,
        universe: &StaticUniverse,
        _signals: Option<&dyn SignalsCollection>,
    ) -> BTreeMap<String, f64> {
        universe
            .assets()
            .iter()
            .map(|a| (a.clone(), 1.0))
            .collect()
    }

    fn name(&self) -> &str {
        "equal_weight"
    }
}

/// Equal weight across the `top_n` assets with the highest signal value.
///
/// Assets without a signal yet (or with a non-positive one) are skipped, so
/// the model holds nothing until the signal window has filled.
#[derive(Debug, Clone, Copy)]
pub struct MomentumAlphaModel {
    top_n: usize,
}

impl MomentumAlphaModel {
    pub fn new(top_n: usize) -> Self {
        Self { top_n: top_n.max(1) }
    }
}

impl AlphaModel for MomentumAlphaModel {
    fn signals(
        &mut self,
        _ts: Timestamp,
        universe: &StaticUniverse,
        signals: Option<&dyn SignalsCollection>,
    ) -> BTreeMap<String, f64> {
        let Some(signals) = signals else {
            return BTreeMap::new();
        };
        let mut ranked: Vec<(&String, f64)> = universe
            .assets()
            .iter()
            .filter_map(|a| signals.signal(a).map(|s| (a, s)))
            .filter(|(_, s)| *s > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(self.top_n)
            .map(|(a, _)| (a.clone(), 1.0))
            .collect()
    }

    fn name(&self) -> &str {
        "momentum"
    }
}
