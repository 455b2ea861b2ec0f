//! Risk models: optional adjustment of alpha weights before sizing.

use crate::domain::Timestamp;
use std::collections::BTreeMap;

pub trait RiskModel: Send {
    fn adjust(&mut self, ts: Timestamp, weights: BTreeMap<String, f64>) -> BTreeMap<String, f64>;

    fn name(&self) -> &str;
}

/// Clamp every weight into `[-max_weight, max_weight]`.
#[derive(Debug, Clone, Copy)]
pub struct WeightCapRiskModel {
    max_weight: f64,
}

impl WeightCapRiskModel {
    pub fn new(max_weight: f64) -> Self {
        Self {
            max_weight: max_weight.abs(),
        }
    }
}

impl RiskModel for WeightCapRiskModel {
    fn adjust(&mut self, _ts: Timestamp, weights: BTreeMap<String, f64>) -> BTreeMap<String, f64> {
        weights
            .into_iter()
            .map(|(a, w)| (a, w.clamp(-self.max_weight, self.max_weight)))
            .collect()
    }

    fn name(&self) -> &str {
        "weight_cap"
    }
}
