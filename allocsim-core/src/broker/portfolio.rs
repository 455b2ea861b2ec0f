//! Broker-side portfolio: cash plus per-asset positions.

use crate::domain::{Timestamp, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Quantities below this are treated as flat.
const QUANTITY_EPSILON: f64 = 1e-9;

/// Net position in one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub asset: String,
    pub quantity: f64,
    /// Volume-weighted entry price of the open quantity.
    pub avg_price: f64,
    /// Last mark-to-market price.
    pub current_price: f64,
    pub realised_pnl: f64,
    pub total_cost: f64,
}

impl Position {
    fn new(asset: &str) -> Self {
        Self {
            asset: asset.to_string(),
            quantity: 0.0,
            avg_price: 0.0,
            current_price: 0.0,
            realised_pnl: 0.0,
            total_cost: 0.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity.abs() < QUANTITY_EPSILON
    }

    pub fn market_value(&self) -> f64 {
        self.quantity * self.current_price
    }

    pub fn unrealised_pnl(&self) -> f64 {
        self.quantity * (self.current_price - self.avg_price)
    }

    /// Apply a fill of signed `quantity` at `price`.
    ///
    /// Adding in the same direction re-weights the average price; trading
    /// against the position realises PnL on the closed part, and any excess
    /// opens a new position at `price`.
    fn apply(&mut self, quantity: f64, price: f64, cost: f64) {
        self.total_cost += cost;
        self.current_price = price;

        let same_direction = self.is_flat() || self.quantity.signum() == quantity.signum();
        if same_direction {
            let new_qty = self.quantity + quantity;
            self.avg_price = (self.avg_price * self.quantity + price * quantity) / new_qty;
            self.quantity = new_qty;
            return;
        }

        let closing = quantity.abs().min(self.quantity.abs());
        self.realised_pnl += closing * (price - self.avg_price) * self.quantity.signum();
        let new_qty = self.quantity + quantity;
        if new_qty.abs() < QUANTITY_EPSILON {
            self.quantity = 0.0;
            self.avg_price = 0.0;
        } else if new_qty.signum() != self.quantity.signum() {
            // flipped through zero
            self.quantity = new_qty;
            self.avg_price = price;
        } else {
            self.quantity = new_qty;
        }
    }
}

/// Read-only view of one position for reporting and order generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub asset: String,
    pub quantity: f64,
    pub avg_price: f64,
    pub market_value: f64,
    pub unrealised_pnl: f64,
    pub realised_pnl: f64,
}

impl From<&Position> for Holding {
    fn from(p: &Position) -> Self {
        Self {
            asset: p.asset.clone(),
            quantity: p.quantity,
            avg_price: p.avg_price,
            market_value: p.market_value(),
            unrealised_pnl: p.unrealised_pnl(),
            realised_pnl: p.realised_pnl,
        }
    }
}

/// A named portfolio held at the broker.
///
/// Accounting identity: `total_equity == cash + sum(position market values)`.
#[derive(Debug, Clone)]
pub struct SimPortfolio {
    pub id: String,
    pub name: String,
    pub created_at: Option<Timestamp>,
    cash: f64,
    positions: BTreeMap<String, Position>,
    transactions: Vec<Transaction>,
}

impl SimPortfolio {
    pub fn new(id: impl Into<String>, name: impl Into<String>, created_at: Option<Timestamp>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at,
            cash: 0.0,
            positions: BTreeMap::new(),
            transactions: Vec::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn subscribe_funds(&mut self, amount: f64) {
        self.cash += amount;
    }

    /// Record an executed transaction: `cash -= price * quantity + cost`.
    pub fn transact(&mut self, txn: Transaction) {
        self.cash -= txn.consideration() + txn.cost;
        self.positions
            .entry(txn.asset.clone())
            .or_insert_with(|| Position::new(&txn.asset))
            .apply(txn.quantity, txn.price, txn.cost);
        self.transactions.push(txn);
    }

    /// Mark an existing position to `price`. Unknown assets are ignored.
    pub fn update_market_value(&mut self, asset: &str, price: f64) {
        if let Some(pos) = self.positions.get_mut(asset) {
            pos.current_price = price;
        }
    }

    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.positions.keys().map(String::as_str)
    }

    pub fn position(&self, asset: &str) -> Option<&Position> {
        self.positions.get(asset).filter(|p| !p.is_flat())
    }

    pub fn total_market_value(&self) -> f64 {
        self.positions.values().map(Position::market_value).sum()
    }

    pub fn total_equity(&self) -> f64 {
        self.cash + self.total_market_value()
    }

    pub fn total_realised_pnl(&self) -> f64 {
        self.positions.values().map(|p| p.realised_pnl).sum()
    }

    pub fn total_cost(&self) -> f64 {
        self.positions.values().map(|p| p.total_cost).sum()
    }

    /// Non-flat positions ordered by asset.
    pub fn holdings(&self) -> Vec<Holding> {
        self.positions
            .values()
            .filter(|p| !p.is_flat())
            .map(Holding::from)
            .collect()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Plain-text holdings table for the console.
    pub fn holdings_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Portfolio {} ({})", self.id, self.name);
        let _ = writeln!(
            out,
            "{:<10} {:>12} {:>12} {:>16} {:>14} {:>14}",
            "Asset", "Quantity", "Avg Price", "Market Value", "Unrealised", "Realised"
        );
        for h in self.holdings() {
            let _ = writeln!(
                out,
                "{:<10} {:>12.2} {:>12.4} {:>16.2} {:>14.2} {:>14.2}",
                h.asset, h.quantity, h.avg_price, h.market_value, h.unrealised_pnl, h.realised_pnl
            );
        }
        let _ = writeln!(out, "{:<10} {:>71.2}", "Cash", self.cash);
        let _ = write!(out, "{:<10} {:>71.2}", "Equity", self.total_equity());
        out
    }
}
