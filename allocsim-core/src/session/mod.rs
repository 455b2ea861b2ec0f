//! Backtest session: the replay loop.
//!
//! The session consumes the engine's events in order. For each event it:
//! 1. advances the broker to the event time,
//! 2. refreshes signals on market close,
//! 3. runs the trading system if the instant is scheduled and past burn-in,
//! 4. records account equity on market close when past burn-in.
//!
//! Skipped instants are never caught up later.

mod builder;
mod burn_in;
mod report;

pub use builder::SessionBuilder;
pub use burn_in::BurnInFilter;
pub use report::{AllocationRow, AllocationTable, EquityCurve, EquityPoint, OutOfOrderEquity};

use crate::broker::{Broker, BrokerError, Holding, MASTER_KEY};
use crate::config::{ConfigError, SessionConfig};
use crate::data::DataError;
use crate::domain::{AllocationError, StaticUniverse};
use crate::observer::SessionObserver;
use crate::schedule::RebalanceSchedule;
use crate::signals::SignalsCollection;
use crate::sim::{SimError, SimulationEngine};
use crate::trading::{AlphaModel, TargetAllocation, TradingError, TradingSystem};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("allocation error: {0}")]
    Allocation(#[from] AllocationError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("simulation engine error: {0}")]
    Sim(#[from] SimError),

    #[error("trading system error: {0}")]
    Trading(#[from] TradingError),

    #[error("universe contains no assets")]
    EmptyUniverse,

    #[error("session has already been run")]
    AlreadyRun,

    #[error("broker reported no 'master' equity")]
    MissingMasterEquity,

    #[error("engine emitted out-of-order market closes: {0}")]
    OutOfOrderEquity(#[from] OutOfOrderEquity),
}

/// Counts from a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub events: usize,
    pub events_before_burn_in: usize,
    pub rebalances: usize,
    pub equity_points: usize,
    pub final_equity: Option<f64>,
    /// Holdings table, when requested.
    pub holdings_report: Option<String>,
}

pub struct BacktestSession {
    config: SessionConfig,
    universe: StaticUniverse,
    schedule: RebalanceSchedule,
    engine: Box<dyn SimulationEngine>,
    broker: Box<dyn Broker>,
    trading: Box<dyn TradingSystem>,
    signals: Option<Box<dyn SignalsCollection>>,
    observer: Box<dyn SessionObserver>,
    burn_in: BurnInFilter,
    equity_curve: EquityCurve,
    target_allocations: Vec<TargetAllocation>,
    has_run: bool,
}

impl BacktestSession {
    pub fn builder(
        config: SessionConfig,
        universe: StaticUniverse,
        alpha_model: Box<dyn AlphaModel>,
    ) -> SessionBuilder {
        SessionBuilder::new(config, universe, alpha_model)
    }

    /// Replay every event. May be called once.
    ///
    /// With `show_holdings` the final holdings table is included in the
    /// summary.
    pub fn run(&mut self, show_holdings: bool) -> Result<RunSummary, SessionError> {
        if self.has_run {
            return Err(SessionError::AlreadyRun);
        }
        self.has_run = true;
        self.observer.on_run_started(self.config.start, self.config.end);

        let mut events = 0usize;
        let mut rebalances = 0usize;
        for event in self.engine.events() {
            events += 1;
            let ts = event.timestamp;
            self.observer.on_event(&event);

            self.broker.update(ts)?;

            if event.is_market_close() {
                if let Some(signals) = self.signals.as_mut() {
                    signals.update(ts, self.broker.data_handler());
                }
            }

            let eligible = self.burn_in.admit(ts);

            if eligible && self.schedule.contains(&ts) {
                let records = self
                    .trading
                    .rebalance(ts, self.broker.as_mut(), self.signals.as_deref())?;
                self.observer.on_rebalance(ts, &records);
                self.target_allocations.extend(records);
                rebalances += 1;
            }

            if eligible && event.is_market_close() {
                let equity = self
                    .broker
                    .account_total_equity()
                    .get(MASTER_KEY)
                    .copied()
                    .ok_or(SessionError::MissingMasterEquity)?;
                let date = ts.date_naive();
                self.equity_curve.push(date, equity)?;
                self.observer.on_equity_recorded(date, equity);
            }
        }

        self.observer.on_run_finished(self.equity_curve.len(), rebalances);

        let holdings_report = if show_holdings {
            Some(self.broker.holdings_report(&self.config.portfolio_id)?)
        } else {
            None
        };

        Ok(RunSummary {
            events,
            events_before_burn_in: self.burn_in.events_skipped(),
            rebalances,
            equity_points: self.equity_curve.len(),
            final_equity: self.equity_curve.last().map(|p| p.equity),
            holdings_report,
        })
    }

    pub fn has_run(&self) -> bool {
        self.has_run
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn universe(&self) -> &StaticUniverse {
        &self.universe
    }

    pub fn schedule(&self) -> &RebalanceSchedule {
        &self.schedule
    }

    pub fn broker(&self) -> &dyn Broker {
        self.broker.as_ref()
    }

    /// Equity at each retained market close.
    pub fn equity_curve(&self) -> &EquityCurve {
        &self.equity_curve
    }

    /// Every allocation record in the order it was produced.
    pub fn target_allocations(&self) -> &[TargetAllocation] {
        &self.target_allocations
    }

    /// Target allocations forward-filled onto the equity curve's dates.
    pub fn allocation_table(&self) -> AllocationTable {
        AllocationTable::forward_filled(
            &self.target_allocations,
            &self.equity_curve,
            self.burn_in.burn_in().map(|b| b.date_naive()),
        )
    }

    pub fn holdings(&self) -> Result<Vec<Holding>, SessionError> {
        Ok(self.broker.holdings(&self.config.portfolio_id)?)
    }
}
