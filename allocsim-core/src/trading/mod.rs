//! Trading system: turns alpha weights into broker orders at each rebalance.

pub mod alpha;
pub mod quant;
pub mod risk;

pub use alpha::{AlphaModel, EqualWeightAlphaModel, FixedSignalsAlphaModel, MomentumAlphaModel};
pub use quant::QuantTradingSystem;
pub use risk::{RiskModel, WeightCapRiskModel};

use crate::broker::{Broker, BrokerError};
use crate::domain::Timestamp;
use crate::signals::SignalsCollection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TradingError {
    #[error("broker rejected rebalance: {0}")]
    Broker(#[from] BrokerError),

    #[error("alpha model '{model}' produced a non-finite weight for '{asset}'")]
    NonFiniteWeight { model: String, asset: String },
}

/// One target allocation produced by a rebalance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetAllocation {
    pub timestamp: Timestamp,
    /// Weight per universe asset; assets without a signal carry 0.
    pub weights: BTreeMap<String, f64>,
}

/// How portfolio weights are scaled into exposure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PortfolioMode {
    /// Negative weights dropped; positives scaled to `1 - cash_buffer_percentage`.
    LongOnly { cash_buffer_percentage: f64 },
    /// Weights scaled so that `sum |w| == gross_leverage`.
    LongShort { gross_leverage: f64 },
}

impl PortfolioMode {
    /// Normalize `weights` and scale them to this mode's target exposure.
    pub fn scale(&self, weights: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
        match *self {
            Self::LongOnly {
                cash_buffer_percentage,
            } => {
                let total: f64 = weights.values().filter(|w| **w > 0.0).sum();
                weights
                    .iter()
                    .map(|(asset, w)| {
                        let scaled = if *w > 0.0 && total > 0.0 {
                            w / total * (1.0 - cash_buffer_percentage)
                        } else {
                            0.0
                        };
                        (asset.clone(), scaled)
                    })
                    .collect()
            }
            Self::LongShort { gross_leverage } => {
                let gross: f64 = weights.values().map(|w| w.abs()).sum();
                weights
                    .iter()
                    .map(|(asset, w)| {
                        let scaled = if gross > 0.0 {
                            w / gross * gross_leverage
                        } else {
                            0.0
                        };
                        (asset.clone(), scaled)
                    })
                    .collect()
            }
        }
    }
}

/// Strategy callback invoked by the session at each scheduled instant.
pub trait TradingSystem: Send {
    /// Re-evaluate the portfolio at `ts`, submitting orders through `broker`.
    ///
    /// Returns the target allocations produced by this call, in order.
    fn rebalance(
        &mut self,
        ts: Timestamp,
        broker: &mut dyn Broker,
        signals: Option<&dyn SignalsCollection>,
    ) -> Result<Vec<TargetAllocation>, TradingError>;
}
