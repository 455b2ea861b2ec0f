//! Broker: account cash, named portfolios, order handling and equity.

pub mod portfolio;
pub mod simulated;

pub use portfolio::{Holding, Position, SimPortfolio};
pub use simulated::SimulatedBroker;

use crate::data::DataHandler;
use crate::domain::{Order, Timestamp, Transaction};
use std::collections::BTreeMap;
use thiserror::Error;

/// Key of the account-wide figure in [`Broker::account_total_equity`].
pub const MASTER_KEY: &str = "master";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BrokerError {
    #[error("portfolio '{0}' does not exist")]
    UnknownPortfolio(String),

    #[error("portfolio '{0}' already exists")]
    DuplicatePortfolio(String),

    #[error("amount must be a non-negative number (got {0})")]
    NegativeAmount(f64),

    #[error("insufficient account cash: requested {requested}, available {available}")]
    InsufficientCash { requested: f64, available: f64 },

    #[error("order for '{asset}' has a non-finite or zero quantity ({quantity})")]
    InvalidOrder { asset: String, quantity: f64 },
}

/// Read-only broker state visible to fee models.
pub trait BrokerContext {
    /// Time of the last [`Broker::update`], `None` before the first one.
    fn current_time(&self) -> Option<Timestamp>;

    /// Cash held at the account level (not allocated to a portfolio).
    fn account_cash(&self) -> f64;
}

/// Brokerage used by a session.
pub trait Broker: BrokerContext + Send {
    /// Advance to `ts`: mark portfolios to market and execute queued orders
    /// when the exchange is open.
    fn update(&mut self, ts: Timestamp) -> Result<(), BrokerError>;

    /// Add external funds to the account cash balance.
    fn subscribe_funds_to_account(&mut self, amount: f64) -> Result<(), BrokerError>;

    fn create_portfolio(&mut self, id: &str, name: &str) -> Result<(), BrokerError>;

    /// Move account cash into a portfolio.
    fn subscribe_funds_to_portfolio(&mut self, id: &str, amount: f64) -> Result<(), BrokerError>;

    /// Submit a market order against a portfolio.
    fn submit_order(&mut self, portfolio_id: &str, order: Order) -> Result<(), BrokerError>;

    /// `"master"` (account cash plus every portfolio) and one entry per portfolio id.
    fn account_total_equity(&self) -> BTreeMap<String, f64>;

    fn portfolio_total_equity(&self, id: &str) -> Result<f64, BrokerError>;

    fn portfolio_cash(&self, id: &str) -> Result<f64, BrokerError>;

    /// Non-flat positions of a portfolio ordered by asset.
    fn holdings(&self, id: &str) -> Result<Vec<Holding>, BrokerError>;

    fn transactions(&self, id: &str) -> Result<Vec<Transaction>, BrokerError>;

    /// Plain-text holdings table.
    fn holdings_report(&self, id: &str) -> Result<String, BrokerError>;

    /// Price the broker would use for `asset` right now.
    fn latest_price(&self, asset: &str) -> Option<f64>;

    fn data_handler(&self) -> &dyn DataHandler;
}
