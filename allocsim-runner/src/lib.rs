//! allocsim runner: run files, session wiring, statistics and reports.
//!
//! This crate builds on `allocsim-core` to provide:
//! - TOML run files (session settings, universe, strategy, risk cap)
//! - Wiring a run file into a `BacktestSession` and replaying it
//! - Performance metrics over the equity curve
//! - Polars views of the equity curve and allocation table

pub mod config;
pub mod metrics;
pub mod reporting;
pub mod runner;

pub use config::{RiskConfig, RunConfigError, RunFile, StrategyConfig};
pub use metrics::PerformanceMetrics;
pub use reporting::{allocation_frame, equity_frame, render_summary};
pub use runner::{build_session, run_backtest, run_file, RunError, RunOutcome};
