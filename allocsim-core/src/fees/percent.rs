//! Percentage-of-consideration fee model.

use super::{check_rate, FeeModel, FeeModelError};
use crate::broker::BrokerContext;

/// Commission and tax charged as fractions of the absolute consideration.
///
/// `0.0005` is 5 basis points.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PercentFeeModel {
    commission_pct: f64,
    tax_pct: f64,
}

impl PercentFeeModel {
    pub fn new(commission_pct: f64, tax_pct: f64) -> Result<Self, FeeModelError> {
        Ok(Self {
            commission_pct: check_rate("commission_pct", commission_pct)?,
            tax_pct: check_rate("tax_pct", tax_pct)?,
        })
    }

    /// Build from basis points, e.g. `from_bps(5.0, 0.0)`.
    pub fn from_bps(commission_bps: f64, tax_bps: f64) -> Result<Self, FeeModelError> {
        Self::new(commission_bps / 10_000.0, tax_bps / 10_000.0)
    }

    pub fn calc_commission(&self, consideration: f64) -> f64 {
        consideration.abs() * self.commission_pct
    }

    pub fn calc_tax(&self, consideration: f64) -> f64 {
        consideration.abs() * self.tax_pct
    }
}

impl FeeModel for PercentFeeModel {
    fn calc_total_cost(
        &self,
        _asset: &str,
        _quantity: f64,
        consideration: f64,
        _broker: Option<&dyn BrokerContext>,
    ) -> f64 {
        self.calc_commission(consideration) + self.calc_tax(consideration)
    }

    fn name(&self) -> &str {
        "percent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commission_in_bps() {
        let model = PercentFeeModel::from_bps(5.0, 0.0).unwrap();
        // 100 * 1000 * 5/10000 = 50
        let cost = model.calc_total_cost("SPY", 1000.0, 100_000.0, None);
        assert!((cost - 50.0).abs() < 1e-9);
    }

    #[test]
    fn sells_cost_the_same_as_buys() {
        let model = PercentFeeModel::new(0.001, 0.0005).unwrap();
        let buy = model.calc_total_cost("SPY", 10.0, 1_000.0, None);
        let sell = model.calc_total_cost("SPY", -10.0, -1_000.0, None);
        assert!((buy - 1.5).abs() < 1e-12);
        assert_eq!(buy, sell);
    }

    #[test]
    fn negative_rates_are_rejected() {
        assert!(PercentFeeModel::new(-0.001, 0.0).is_err());
    }
}
