//! allocsim core: schedule generation, fee models, allocations and the replay loop.
//!
//! This crate contains the backtest session and its collaborators:
//! - Rebalance schedule generation (daily / weekly / monthly / never)
//! - Fee models (zero, flat per-share, percent of consideration)
//! - Static allocation container with construction-time validation
//! - Simulated exchange, daily business-day simulation engine
//! - CSV / in-memory price data, simulated broker
//! - Quant trading system (alpha + risk + long-only / long-short sizing)
//! - The session control loop with burn-in and reporting accessors

pub mod broker;
pub mod config;
pub mod data;
pub mod domain;
pub mod exchange;
pub mod fees;
pub mod observer;
pub mod schedule;
pub mod session;
pub mod signals;
pub mod sim;
pub mod trading;

pub use config::{ConfigError, FeeConfig, SessionConfig};
pub use domain::{Allocation, AllocationError, StaticUniverse};
pub use schedule::{MarketAnchor, RebalancePeriod, RebalanceSchedule};
pub use session::{BacktestSession, RunSummary, SessionBuilder, SessionError};
