//! Tabular views of a finished replay and a plain-text summary.

use std::fmt::Write as _;

use allocsim_core::session::{AllocationTable, EquityCurve, RunSummary};
use chrono::{Datelike, NaiveDate};
use polars::prelude::{Column, DataFrame, DataType, PolarsResult};

use crate::metrics::{daily_returns, PerformanceMetrics};

/// Days from 0001-01-01 to 1970-01-01; polars stores dates as days since the epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn epoch_days(dates: impl IntoIterator<Item = NaiveDate>) -> Vec<i32> {
    dates
        .into_iter()
        .map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
        .collect()
}

/// `date`, `equity`, `return` (null on the first row) and `drawdown`.
pub fn equity_frame(curve: &EquityCurve) -> PolarsResult<DataFrame> {
    let values = curve.values();

    let mut returns: Vec<Option<f64>> = Vec::with_capacity(values.len());
    if !values.is_empty() {
        returns.push(None);
        returns.extend(daily_returns(&values).into_iter().map(Some));
    }

    let mut peak = f64::MIN;
    let drawdown: Vec<f64> = values
        .iter()
        .map(|&v| {
            peak = peak.max(v);
            if peak > 0.0 {
                (v - peak) / peak
            } else {
                0.0
            }
        })
        .collect();

    DataFrame::new(vec![
        Column::new("date".into(), epoch_days(curve.dates())).cast(&DataType::Date)?,
        Column::new("equity".into(), values),
        Column::new("return".into(), returns),
        Column::new("drawdown".into(), drawdown),
    ])
}

/// `date` followed by one nullable weight column per ticker.
pub fn allocation_frame(table: &AllocationTable) -> PolarsResult<DataFrame> {
    let dates = table.rows().iter().map(|r| r.date);
    let mut columns = vec![Column::new("date".into(), epoch_days(dates)).cast(&DataType::Date)?];
    for (idx, ticker) in table.tickers().iter().enumerate() {
        let weights: Vec<Option<f64>> = table.rows().iter().map(|r| r.weights[idx]).collect();
        columns.push(Column::new(ticker.as_str().into(), weights));
    }
    DataFrame::new(columns)
}

/// Human-readable run summary for the console.
pub fn render_summary(strategy: &str, summary: &RunSummary, metrics: &PerformanceMetrics) -> String {
    let mut out = String::new();
    // writing to a String cannot fail
    let _ = writeln!(out, "Strategy:         {strategy}");
    let _ = writeln!(out, "Events replayed:  {}", summary.events);
    let _ = writeln!(out, "Before burn-in:   {}", summary.events_before_burn_in);
    let _ = writeln!(out, "Rebalances:       {}", summary.rebalances);
    let _ = writeln!(out, "Equity points:    {}", summary.equity_points);
    let _ = writeln!(out, "Fills:            {}", metrics.fills);
    let _ = writeln!(out, "Fees paid:        {:.2}", metrics.total_fees);
    let _ = writeln!(out);
    let _ = writeln!(out, "Initial equity:   {:.2}", metrics.initial_equity);
    let _ = writeln!(out, "Final equity:     {:.2}", metrics.final_equity);
    let _ = writeln!(out, "Total return:     {:.2}%", metrics.total_return * 100.0);
    let _ = writeln!(out, "CAGR:             {:.2}%", metrics.cagr * 100.0);
    let _ = writeln!(out, "Volatility:       {:.2}%", metrics.volatility * 100.0);
    let _ = writeln!(out, "Sharpe:           {:.2}", metrics.sharpe);
    let _ = writeln!(out, "Sortino:          {:.2}", metrics.sortino);
    let _ = writeln!(out, "Max drawdown:     {:.2}%", metrics.max_drawdown * 100.0);
    let _ = writeln!(out, "Calmar:           {:.2}", metrics.calmar);
    let _ = writeln!(out, "Turnover:         {:.2}x/yr", metrics.turnover);
    if let Some(report) = &summary.holdings_report {
        let _ = writeln!(out);
        out.push_str(report);
        if !report.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocsim_core::trading::TargetAllocation;
    use chrono::{TimeZone, Utc};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn sample_curve() -> EquityCurve {
        let mut c = EquityCurve::new();
        c.push(date(1, 30), 100.0).unwrap();
        c.push(date(1, 31), 110.0).unwrap();
        c.push(date(2, 1), 99.0).unwrap();
        c
    }

    #[test]
    fn epoch_days_matches_unix_epoch() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(epoch_days([epoch, date(1, 1)]), vec![0, 19_723]);
    }

    #[test]
    fn equity_frame_columns() {
        let df = equity_frame(&sample_curve()).unwrap();
        assert_eq!(df.height(), 3);
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["date", "equity", "return", "drawdown"]);
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);

        let returns = df.column("return").unwrap().f64().unwrap();
        assert_eq!(returns.get(0), None);
        assert!((returns.get(1).unwrap() - 0.1).abs() < 1e-12);

        let dd = df.column("drawdown").unwrap().f64().unwrap();
        assert_eq!(dd.get(1), Some(0.0));
        assert!((dd.get(2).unwrap() + 0.1).abs() < 1e-12);
    }

    #[test]
    fn equity_frame_empty_curve() {
        let df = equity_frame(&EquityCurve::new()).unwrap();
        assert_eq!(df.height(), 0);
    }

    #[test]
    fn allocation_frame_keeps_missing_weights_null() {
        let history = vec![TargetAllocation {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 31, 21, 0, 0).unwrap(),
            weights: [("SPY".to_string(), 0.6), ("AGG".to_string(), 0.4)]
                .into_iter()
                .collect(),
        }];
        let table = AllocationTable::forward_filled(&history, &sample_curve(), None);
        let df = allocation_frame(&table).unwrap();

        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["date", "AGG", "SPY"]);
        let spy = df.column("SPY").unwrap().f64().unwrap();
        assert_eq!(spy.get(0), None);
        assert_eq!(spy.get(1), Some(0.6));
        assert_eq!(spy.get(2), Some(0.6));
    }

    #[test]
    fn summary_includes_holdings_when_present() {
        let summary = RunSummary {
            events: 10,
            events_before_burn_in: 2,
            rebalances: 1,
            equity_points: 4,
            final_equity: Some(1_020.0),
            holdings_report: Some("SPY  10".into()),
        };
        let metrics = PerformanceMetrics {
            final_equity: 1_020.0,
            total_return: 0.02,
            ..Default::default()
        };
        let text = render_summary("static_weights", &summary, &metrics);
        assert!(text.contains("Strategy:         static_weights"));
        assert!(text.contains("Total return:     2.00%"));
        assert!(text.ends_with("SPY  10\n"));
    }
}
