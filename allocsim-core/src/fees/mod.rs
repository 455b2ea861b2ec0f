//! Fee models: transaction cost estimates.
//!
//! A fee model maps a trade (asset, signed quantity, consideration) to a
//! non-negative total cost. Implementations are pure: the broker may call
//! them speculatively (cost-aware sizing) without changing any state.

pub mod flat;
pub mod percent;
pub mod zero;

pub use flat::FlatFeeModel;
pub use percent::PercentFeeModel;
pub use zero::ZeroFeeModel;

use crate::broker::BrokerContext;
use thiserror::Error;

/// Invalid fee model parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeeModelError {
    #[error("{field} must be a non-negative number (got {value})")]
    NegativeRate { field: &'static str, value: f64 },
}

/// Transaction cost model.
pub trait FeeModel: Send + Sync + std::fmt::Debug {
    /// Total cost (commission + tax) for a trade.
    ///
    /// `quantity` is signed (negative for sells); `consideration` is
    /// price × quantity and may be negative for the same reason.
    fn calc_total_cost(
        &self,
        asset: &str,
        quantity: f64,
        consideration: f64,
        broker: Option<&dyn BrokerContext>,
    ) -> f64;

    /// Model name for logs and reports.
    fn name(&self) -> &str;
}

pub(crate) fn check_rate(field: &'static str, value: f64) -> Result<f64, FeeModelError> {
    if value >= 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(FeeModelError::NegativeRate { field, value })
    }
}
