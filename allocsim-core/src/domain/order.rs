//! Orders and executed transactions.

use super::Timestamp;
use serde::{Deserialize, Serialize};

/// Market order for a signed quantity (positive buys, negative sells).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub asset: String,
    pub quantity: f64,
}

impl Order {
    pub fn new(asset: impl Into<String>, quantity: f64) -> Self {
        Self {
            asset: asset.into(),
            quantity,
        }
    }

    pub fn is_buy(&self) -> bool {
        self.quantity > 0.0
    }
}

/// An executed order as recorded by a portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub timestamp: Timestamp,
    pub asset: String,
    pub quantity: f64,
    pub price: f64,
    /// Total transaction cost charged by the fee model.
    pub cost: f64,
}

impl Transaction {
    /// Price × quantity, signed like the quantity.
    pub fn consideration(&self) -> f64 {
        self.price * self.quantity
    }
}
