//! Flat per-share commission plus flat per-share tax.

use super::{check_rate, FeeModel, FeeModelError};
use crate::broker::BrokerContext;

/// Per-share fee model.
///
/// `commission = |quantity| * fee_per_share`, `tax = |quantity| * tax_per_share`.
/// The consideration is ignored, so buys and sells of the same size cost the same.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlatFeeModel {
    fee_per_share: f64,
    tax_per_share: f64,
}

impl FlatFeeModel {
    pub fn new(fee_per_share: f64, tax_per_share: f64) -> Result<Self, FeeModelError> {
        Ok(Self {
            fee_per_share: check_rate("fee_per_share", fee_per_share)?,
            tax_per_share: check_rate("tax_per_share", tax_per_share)?,
        })
    }

    pub fn fee_per_share(&self) -> f64 {
        self.fee_per_share
    }

    pub fn tax_per_share(&self) -> f64 {
        self.tax_per_share
    }

    pub fn calc_commission(&self, quantity: f64) -> f64 {
        quantity.abs() * self.fee_per_share
    }

    pub fn calc_tax(&self, quantity: f64) -> f64 {
        quantity.abs() * self.tax_per_share
    }
}

impl FeeModel for FlatFeeModel {
    fn calc_total_cost(
        &self,
        _asset: &str,
        quantity: f64,
        _consideration: f64,
        _broker: Option<&dyn BrokerContext>,
    ) -> f64 {
        self.calc_commission(quantity) + self.calc_tax(quantity)
    }

    fn name(&self) -> &str {
        "flat"
    }
}
