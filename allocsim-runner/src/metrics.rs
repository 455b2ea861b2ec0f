//! Performance metrics: pure functions over an equity curve.
//!
//! Every metric takes the curve's values (and, for turnover, the traded
//! notional) and returns a scalar. Nothing here touches the session.

use allocsim_core::domain::Transaction;
use allocsim_core::session::EquityCurve;
use serde::{Deserialize, Serialize};

/// Trading days per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Summary statistics for one replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub initial_equity: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub max_drawdown: f64,
    pub volatility: f64,
    pub trading_days: usize,
    pub rebalances: usize,
    pub fills: usize,
    pub total_fees: f64,
    pub turnover: f64,
}

impl PerformanceMetrics {
    /// Compute every metric from the recorded curve and the portfolio's fills.
    pub fn compute(curve: &EquityCurve, transactions: &[Transaction], rebalances: usize) -> Self {
        let equity = curve.values();
        let trading_days = equity.len();
        let initial_equity = equity.first().copied().unwrap_or(0.0);
        let final_equity = equity.last().copied().unwrap_or(0.0);
        let notional: Vec<f64> = transactions.iter().map(|t| t.consideration().abs()).collect();

        Self {
            initial_equity,
            final_equity,
            total_return: total_return(&equity),
            cagr: cagr(&equity, trading_days),
            sharpe: sharpe_ratio(&equity, 0.0),
            sortino: sortino_ratio(&equity, 0.0),
            calmar: calmar_ratio(&equity, trading_days),
            max_drawdown: max_drawdown(&equity),
            volatility: annualized_volatility(&equity),
            trading_days,
            rebalances,
            fills: transactions.len(),
            total_fees: transactions.iter().map(|t| t.cost).sum(),
            turnover: turnover(&notional, initial_equity, trading_days),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity: &[f64]) -> f64 {
    let (Some(&initial), Some(&final_eq)) = (equity.first(), equity.last()) else {
        return 0.0;
    };
    if equity.len() < 2 || initial <= 0.0 {
        return 0.0;
    }
    (final_eq - initial) / initial
}

/// Compound annual growth rate over `trading_days` recorded closes.
pub fn cagr(equity: &[f64], trading_days: usize) -> f64 {
    let (Some(&initial), Some(&final_eq)) = (equity.first(), equity.last()) else {
        return 0.0;
    };
    if trading_days < 2 || initial <= 0.0 || final_eq <= 0.0 {
        return 0.0;
    }
    let years = trading_days as f64 / TRADING_DAYS_PER_YEAR;
    (final_eq / initial).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe ratio: mean excess daily return over its standard
/// deviation, scaled by sqrt(252). Zero for flat curves.
pub fn sharpe_ratio(equity: &[f64], risk_free_rate: f64) -> f64 {
    let excess = excess_returns(equity, risk_free_rate);
    if excess.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&excess);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&excess) / std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualized Sortino ratio, using downside deviation over all periods.
pub fn sortino_ratio(equity: &[f64], risk_free_rate: f64) -> f64 {
    let excess = excess_returns(equity, risk_free_rate);
    if excess.len() < 2 {
        return 0.0;
    }
    let downside_sq: f64 = excess.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    if downside_sq == 0.0 {
        return 0.0;
    }
    let downside_std = (downside_sq / excess.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean_f64(&excess) / downside_std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// CAGR over |max drawdown|; zero without a drawdown or without growth.
pub fn calmar_ratio(equity: &[f64], trading_days: usize) -> f64 {
    let growth = cagr(equity, trading_days);
    let dd = max_drawdown(equity);
    if dd >= 0.0 || growth <= 0.0 {
        return 0.0;
    }
    growth / dd.abs()
}

/// Largest peak-to-trough fall as a negative fraction (-0.2 = 20%).
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for &eq in equity {
        peak = peak.max(eq);
        if peak > 0.0 {
            worst = worst.min((eq - peak) / peak);
        }
    }
    worst
}

/// Standard deviation of daily returns, annualized.
pub fn annualized_volatility(equity: &[f64]) -> f64 {
    std_dev(&daily_returns(equity)) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Traded notional per unit of starting capital, per year.
pub fn turnover(notional: &[f64], initial_capital: f64, trading_days: usize) -> f64 {
    if notional.is_empty() || initial_capital <= 0.0 || trading_days < 2 {
        return 0.0;
    }
    let years = trading_days as f64 / TRADING_DAYS_PER_YEAR;
    notional.iter().sum::<f64>() / initial_capital / years
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive points.
pub fn daily_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

fn excess_returns(equity: &[f64], risk_free_rate: f64) -> Vec<f64> {
    let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    daily_returns(equity).into_iter().map(|r| r - daily_rf).collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn curve(values: &[f64]) -> EquityCurve {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut c = EquityCurve::new();
        for (i, v) in values.iter().enumerate() {
            c.push(start + chrono::Duration::days(i as i64), *v).unwrap();
        }
        c
    }

    fn fill(quantity: f64, price: f64, cost: f64) -> Transaction {
        Transaction {
            asset: "SPY".into(),
            quantity,
            price,
            cost,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap(),
        }
    }

    // ── Returns ──

    #[test]
    fn total_return_positive() {
        let eq = [100_000.0, 100_500.0, 101_000.0, 110_000.0];
        assert!((total_return(&eq) - 0.1).abs() < 1e-10);
    }

    #[test]
    fn total_return_short_curves() {
        assert_eq!(total_return(&[]), 0.0);
        assert_eq!(total_return(&[100_000.0]), 0.0);
    }

    #[test]
    fn cagr_one_year() {
        let mut eq = vec![100_000.0];
        let daily = 1.1_f64.powf(1.0 / 251.0);
        for i in 1..252 {
            eq.push(eq[i - 1] * daily);
        }
        let c = cagr(&eq, 252);
        assert!((c - 0.1).abs() < 0.005, "CAGR should be ~10%, got {c}");
    }

    #[test]
    fn cagr_constant_equity_is_zero() {
        assert_eq!(cagr(&[100_000.0; 252], 252), 0.0);
    }

    // ── Risk-adjusted ──

    #[test]
    fn sharpe_and_sortino_flat_are_zero() {
        let eq = [100_000.0; 50];
        assert_eq!(sharpe_ratio(&eq, 0.0), 0.0);
        assert_eq!(sortino_ratio(&eq, 0.0), 0.0);
        assert_eq!(annualized_volatility(&eq), 0.0);
    }

    #[test]
    fn sharpe_positive_for_steady_gains() {
        let mut eq = vec![100_000.0];
        for i in 1..253 {
            let r = if i % 2 == 0 { 1.002 } else { 1.0005 };
            eq.push(eq[i - 1] * r);
        }
        assert!(sharpe_ratio(&eq, 0.0) > 5.0);
        // no losing days
        assert_eq!(sortino_ratio(&eq, 0.0), 0.0);
    }

    #[test]
    fn sortino_negative_for_losses() {
        let eq = [100.0, 99.0, 98.5, 99.0, 97.0];
        assert!(sortino_ratio(&eq, 0.0) < 0.0);
    }

    // ── Drawdown ──

    #[test]
    fn max_drawdown_peak_to_trough() {
        let eq = [100.0, 120.0, 90.0, 110.0, 130.0];
        assert!((max_drawdown(&eq) - (-0.25)).abs() < 1e-12);
    }

    #[test]
    fn max_drawdown_monotonic_is_zero() {
        assert_eq!(max_drawdown(&[100.0, 101.0, 102.0]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn calmar_needs_drawdown_and_growth() {
        assert_eq!(calmar_ratio(&[100.0, 101.0, 102.0], 3), 0.0);
        let eq = [100.0, 120.0, 90.0, 150.0];
        assert!(calmar_ratio(&eq, 4) > 0.0);
    }

    // ── Turnover ──

    #[test]
    fn turnover_one_year() {
        let t = turnover(&[50_000.0, 50_000.0], 100_000.0, 252);
        assert!((t - 1.0).abs() < 1e-12);
        assert_eq!(turnover(&[], 100_000.0, 252), 0.0);
    }

    // ── Aggregate ──

    #[test]
    fn compute_from_curve_and_fills() {
        let c = curve(&[1_000.0, 1_010.0, 990.0, 1_020.0]);
        let fills = vec![fill(5.0, 100.0, 1.0), fill(-2.0, 101.0, 0.5)];
        let m = PerformanceMetrics::compute(&c, &fills, 2);

        assert_eq!(m.initial_equity, 1_000.0);
        assert_eq!(m.final_equity, 1_020.0);
        assert!((m.total_return - 0.02).abs() < 1e-12);
        assert_eq!(m.trading_days, 4);
        assert_eq!(m.rebalances, 2);
        assert_eq!(m.fills, 2);
        assert!((m.total_fees - 1.5).abs() < 1e-12);
        assert!(m.max_drawdown < 0.0);
    }

    #[test]
    fn compute_on_empty_curve_is_default() {
        let m = PerformanceMetrics::compute(&EquityCurve::new(), &[], 0);
        assert_eq!(m, PerformanceMetrics::default());
    }

    #[test]
    fn daily_returns_basic() {
        let r = daily_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(r.len(), 2);
        assert!((r[0] - 0.1).abs() < 1e-12);
        assert!((r[1] + 0.1).abs() < 1e-12);
    }
}
