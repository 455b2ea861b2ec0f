//! Property tests for the performance metrics.
//!
//! 1. Max drawdown of a positive curve lies in [-1, 0]
//! 2. Total return has the sign of final minus initial equity
//! 3. Aggregate metrics agree with the curve they were computed from

use allocsim_core::session::EquityCurve;
use allocsim_runner::metrics::{daily_returns, max_drawdown, total_return};
use allocsim_runner::PerformanceMetrics;
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

fn arb_equity() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..1e6, 2..200)
}

fn curve(values: &[f64]) -> EquityCurve {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut c = EquityCurve::new();
    for (i, v) in values.iter().enumerate() {
        c.push(start + Duration::days(i as i64), *v).unwrap();
    }
    c
}

proptest! {
    #[test]
    fn max_drawdown_is_bounded(equity in arb_equity()) {
        let dd = max_drawdown(&equity);
        prop_assert!(dd <= 0.0);
        prop_assert!(dd >= -1.0);
    }

    #[test]
    fn total_return_sign_follows_equity_change(equity in arb_equity()) {
        let change = equity[equity.len() - 1] - equity[0];
        let r = total_return(&equity);
        if change > 0.0 {
            prop_assert!(r > 0.0);
        } else if change < 0.0 {
            prop_assert!(r < 0.0);
        } else {
            prop_assert_eq!(r, 0.0);
        }
    }

    #[test]
    fn compute_matches_curve(equity in arb_equity()) {
        let m = PerformanceMetrics::compute(&curve(&equity), &[], 0);

        prop_assert_eq!(m.trading_days, equity.len());
        prop_assert_eq!(m.initial_equity, equity[0]);
        prop_assert_eq!(m.final_equity, equity[equity.len() - 1]);
        prop_assert_eq!(m.max_drawdown, max_drawdown(&equity));
        prop_assert_eq!(m.fills, 0);
        prop_assert_eq!(m.turnover, 0.0);
        prop_assert_eq!(daily_returns(&equity).len(), equity.len() - 1);
    }
}
