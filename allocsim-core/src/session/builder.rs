use super::{BacktestSession, BurnInFilter, SessionError};
use crate::broker::{Broker, SimulatedBroker};
use crate::config::{ConfigError, SessionConfig};
use crate::data::{load_csv_dir, resolve_csv_dir, DataHandler};
use crate::domain::StaticUniverse;
use crate::exchange::SimulatedExchange;
use crate::fees::FeeModel;
use crate::observer::{SessionObserver, TracingObserver};
use crate::schedule::{self, RebalanceSchedule};
use crate::sim::{DailyBusinessDaySimulationEngine, SimulationEngine};
use crate::signals::SignalsCollection;
use crate::trading::{AlphaModel, QuantTradingSystem, RiskModel, TradingSystem};

/// Assembles a [`BacktestSession`], filling every collaborator not supplied
/// with its default.
///
/// All validation happens in [`SessionBuilder::build`], before any event is
/// processed.
pub struct SessionBuilder {
    config: SessionConfig,
    universe: StaticUniverse,
    alpha_model: Box<dyn AlphaModel>,
    risk_model: Option<Box<dyn RiskModel>>,
    signals: Option<Box<dyn SignalsCollection>>,
    fee_model: Option<Box<dyn FeeModel>>,
    data_handler: Option<Box<dyn DataHandler>>,
    engine: Option<Box<dyn SimulationEngine>>,
    trading_system: Option<Box<dyn TradingSystem>>,
    observer: Option<Box<dyn SessionObserver>>,
}

impl SessionBuilder {
    pub fn new(
        config: SessionConfig,
        universe: StaticUniverse,
        alpha_model: Box<dyn AlphaModel>,
    ) -> Self {
        Self {
            config,
            universe,
            alpha_model,
            risk_model: None,
            signals: None,
            fee_model: None,
            data_handler: None,
            engine: None,
            trading_system: None,
            observer: None,
        }
    }

    pub fn risk_model(mut self, risk_model: Box<dyn RiskModel>) -> Self {
        self.risk_model = Some(risk_model);
        self
    }

    pub fn signals(mut self, signals: Box<dyn SignalsCollection>) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Overrides `config.fees`.
    pub fn fee_model(mut self, fee_model: Box<dyn FeeModel>) -> Self {
        self.fee_model = Some(fee_model);
        self
    }

    /// Overrides the CSV data source.
    pub fn data_handler(mut self, data_handler: Box<dyn DataHandler>) -> Self {
        self.data_handler = Some(data_handler);
        self
    }

    /// Replace the default event engine. Its market closes must fall on
    /// strictly increasing dates, otherwise `run` fails.
    pub fn engine(mut self, engine: Box<dyn SimulationEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Replaces the [`QuantTradingSystem`] built from the alpha model.
    pub fn trading_system(mut self, trading_system: Box<dyn TradingSystem>) -> Self {
        self.trading_system = Some(trading_system);
        self
    }

    pub fn observer(mut self, observer: Box<dyn SessionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Result<BacktestSession, SessionError> {
        let config = self.config;
        let mode = config.validate()?;
        if self.universe.is_empty() {
            return Err(SessionError::EmptyUniverse);
        }

        let fee_model = match self.fee_model {
            Some(fee_model) => fee_model,
            None => config.fees.build().map_err(ConfigError::from)?,
        };

        let data_handler: Box<dyn DataHandler> = match self.data_handler {
            Some(data_handler) => data_handler,
            None => {
                let dir = resolve_csv_dir(config.csv_data_dir.as_deref());
                Box::new(load_csv_dir(&dir, self.universe.assets())?)
            }
        };

        let mut broker = SimulatedBroker::new(
            config.account_name.clone(),
            SimulatedExchange::default(),
            data_handler,
            fee_model,
            config.initial_cash,
        )?;
        broker.create_portfolio(&config.portfolio_id, &config.portfolio_name)?;
        broker.subscribe_funds_to_portfolio(&config.portfolio_id, config.initial_cash)?;

        let engine: Box<dyn SimulationEngine> = match self.engine {
            Some(engine) => engine,
            None => Box::new(DailyBusinessDaySimulationEngine::new(
                config.start,
                config.end,
                false,
                false,
            )?),
        };

        let schedule = schedule::generate(
            &config.start,
            &config.end,
            config.rebalance,
            config.rebalance_weekday,
            config.rebalance_anchor,
        )?;
        check_event_grid(&schedule, engine.as_ref())?;

        let trading: Box<dyn TradingSystem> = match self.trading_system {
            Some(trading) => trading,
            None => Box::new(QuantTradingSystem::new(
                self.universe.clone(),
                config.portfolio_id.clone(),
                self.alpha_model,
                self.risk_model,
                mode,
            )),
        };

        tracing::debug!(
            rebalances = schedule.len(),
            period = ?config.rebalance,
            fee_model = broker.fee_model().name(),
            "session built"
        );

        Ok(BacktestSession {
            burn_in: BurnInFilter::new(config.burn_in),
            config,
            universe: self.universe,
            schedule,
            engine,
            broker: Box::new(broker) as Box<dyn Broker>,
            trading,
            signals: self.signals,
            observer: self.observer.unwrap_or_else(|| Box::new(TracingObserver)),
            equity_curve: Default::default(),
            target_allocations: Vec::new(),
            has_run: false,
        })
    }
}

/// Every rebalance instant must be a time of day the engine emits events at.
fn check_event_grid(
    schedule: &RebalanceSchedule,
    engine: &dyn SimulationEngine,
) -> Result<(), ConfigError> {
    let times = engine.event_times();
    match schedule.iter().find(|ts| !times.contains(&ts.time())) {
        Some(ts) => Err(ConfigError::ScheduleOffEventGrid(*ts)),
        None => Ok(()),
    }
}
