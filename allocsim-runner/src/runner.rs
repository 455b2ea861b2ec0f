//! Session wiring: turns a [`RunFile`] into a replayed [`RunOutcome`].

use std::path::Path;

use allocsim_core::data::DataHandler;
use allocsim_core::session::{AllocationTable, BacktestSession, EquityCurve, RunSummary, SessionError};
use allocsim_core::signals::MomentumSignals;
use allocsim_core::trading::{
    AlphaModel, EqualWeightAlphaModel, FixedSignalsAlphaModel, MomentumAlphaModel,
    TargetAllocation, WeightCapRiskModel,
};
use anyhow::Context;
use serde::Serialize;
use thiserror::Error;

use crate::config::{RunConfigError, RunFile, StrategyConfig};
use crate::metrics::PerformanceMetrics;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("run file error: {0}")]
    Config(#[from] RunConfigError),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

/// Everything a finished replay produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub strategy: String,
    pub summary: RunSummary,
    pub metrics: PerformanceMetrics,
    pub equity_curve: EquityCurve,
    pub target_allocations: Vec<TargetAllocation>,
    pub allocation_table: AllocationTable,
}

/// Build a session for `run`. Prices come from `data` when given, otherwise
/// from the CSV directory the session configuration resolves to.
pub fn build_session(
    run: &RunFile,
    data: Option<Box<dyn DataHandler>>,
) -> Result<BacktestSession, RunError> {
    run.validate()?;

    let alpha: Box<dyn AlphaModel> = match &run.strategy {
        StrategyConfig::StaticWeights { weights } => {
            Box::new(FixedSignalsAlphaModel::new(weights.clone()))
        }
        StrategyConfig::EqualWeight => Box::new(EqualWeightAlphaModel),
        StrategyConfig::Momentum { top_n, .. } => Box::new(MomentumAlphaModel::new(*top_n)),
    };

    let mut builder = BacktestSession::builder(run.session.clone(), run.universe.clone(), alpha);
    if let StrategyConfig::Momentum { lookback, .. } = run.strategy {
        builder = builder.signals(Box::new(MomentumSignals::new(run.universe.clone(), lookback)));
    }
    if let Some(risk) = run.risk {
        builder = builder.risk_model(Box::new(WeightCapRiskModel::new(risk.max_weight)));
    }
    if let Some(data) = data {
        builder = builder.data_handler(data);
    }

    Ok(builder.build()?)
}

/// Replay `run` to completion and compute its statistics.
pub fn run_backtest(
    run: &RunFile,
    data: Option<Box<dyn DataHandler>>,
    show_holdings: bool,
) -> Result<RunOutcome, RunError> {
    let mut session = build_session(run, data)?;
    tracing::info!(
        strategy = run.strategy.name(),
        assets = run.universe.len(),
        rebalances_scheduled = session.schedule().len(),
        "running backtest"
    );

    let summary = session.run(show_holdings)?;
    let transactions = session
        .broker()
        .transactions(&run.session.portfolio_id)
        .map_err(SessionError::from)?;
    let metrics = PerformanceMetrics::compute(session.equity_curve(), &transactions, summary.rebalances);

    Ok(RunOutcome {
        strategy: run.strategy.name().to_string(),
        summary,
        metrics,
        equity_curve: session.equity_curve().clone(),
        target_allocations: session.target_allocations().to_vec(),
        allocation_table: session.allocation_table(),
    })
}

/// Load a run file from disk and replay it against its CSV data.
pub fn run_file(path: &Path, show_holdings: bool) -> anyhow::Result<RunOutcome> {
    let run = RunFile::load(path)
        .with_context(|| format!("Failed to load run file {}", path.display()))?;
    run_backtest(&run, None, show_holdings)
        .with_context(|| format!("Backtest from {} failed", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocsim_core::data::{BarDataHandler, DailyBar};
    use allocsim_core::exchange::business_days;
    use chrono::NaiveDate;

    fn data() -> Box<BarDataHandler> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let bars = |base: f64, step: f64| -> Vec<DailyBar> {
            business_days(start, end)
                .enumerate()
                .map(|(i, d)| DailyBar::flat(d, base + step * i as f64))
                .collect()
        };
        Box::new(
            BarDataHandler::new()
                .with_bars("SPY", bars(100.0, 0.5))
                .unwrap()
                .with_bars("AGG", bars(50.0, 0.0))
                .unwrap(),
        )
    }

    const RUN: &str = r#"
universe = ["SPY", "AGG"]

[session]
start = "2024-01-01"
end = "2024-03-31"
rebalance = "monthly"
gross_leverage = 1.0

[strategy]
type = "equal_weight"
"#;

    #[test]
    fn equal_weight_run_produces_outcome() {
        let run = RunFile::from_toml(RUN).unwrap();
        let outcome = run_backtest(&run, Some(data()), false).unwrap();

        assert_eq!(outcome.strategy, "equal_weight");
        assert_eq!(outcome.summary.rebalances, 3);
        assert_eq!(outcome.target_allocations.len(), 3);
        assert_eq!(outcome.equity_curve.len(), outcome.summary.equity_points);
        assert_eq!(outcome.allocation_table.len(), outcome.equity_curve.len());
        assert_eq!(outcome.metrics.rebalances, 3);
        assert!(outcome.metrics.fills > 0);
        assert!(outcome.metrics.final_equity > outcome.metrics.initial_equity);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["summary"]["rebalances"], 3);
        assert_eq!(
            json["equity_curve"].as_array().unwrap().len(),
            outcome.equity_curve.len()
        );
    }

    #[test]
    fn session_errors_surface_as_run_errors() {
        let text = RUN.replace("gross_leverage = 1.0\n", "");
        let run = RunFile::from_toml(&text).unwrap();
        assert!(matches!(
            build_session(&run, Some(data())),
            Err(RunError::Session(SessionError::Config(_)))
        ));
    }

    #[test]
    fn run_file_reports_path_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let err = run_file(&path, false).unwrap_err();
        assert!(format!("{err:#}").contains("missing.toml"));
    }
}
