use super::FeeModel;
use crate::broker::BrokerContext;

/// Frictionless trading: every trade costs nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ZeroFeeModel;

impl FeeModel for ZeroFeeModel {
    fn calc_total_cost(
        &self,
        _asset: &str,
        _quantity: f64,
        _consideration: f64,
        _broker: Option<&dyn BrokerContext>,
    ) -> f64 {
        0.0
    }

    fn name(&self) -> &str {
        "zero"
    }
}
