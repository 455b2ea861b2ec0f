//! CSV daily-bar source in the Yahoo Finance download layout.
//!
//! One file per ticker, `<dir>/<TICKER>.csv`, with the header
//! `Date,Open,High,Low,Close,Adj Close,Volume`. Rows with `null` prices
//! (Yahoo's marker for missing data) are skipped.

use super::{BarDataHandler, DailyBar, DataError};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable consulted when no CSV directory is configured.
pub const CSV_DATA_DIR_ENV: &str = "ALLOCSIM_CSV_DATA_DIR";

#[derive(Debug, Deserialize)]
struct YahooRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Open", deserialize_with = "csv::invalid_option")]
    open: Option<f64>,
    #[serde(rename = "High", deserialize_with = "csv::invalid_option")]
    high: Option<f64>,
    #[serde(rename = "Low", deserialize_with = "csv::invalid_option")]
    low: Option<f64>,
    #[serde(rename = "Close", deserialize_with = "csv::invalid_option")]
    close: Option<f64>,
    #[serde(rename = "Adj Close", deserialize_with = "csv::invalid_option")]
    adj_close: Option<f64>,
    #[serde(rename = "Volume", default, deserialize_with = "csv::invalid_option")]
    volume: Option<f64>,
}

impl YahooRow {
    fn into_bar(self) -> Option<DailyBar> {
        let close = self.close?;
        Some(DailyBar {
            date: self.date,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close,
            adj_close: self.adj_close.unwrap_or(close),
            volume: self.volume.unwrap_or(0.0),
        })
    }
}

/// Directory to load CSV files from.
///
/// Order: the configured directory, then `ALLOCSIM_CSV_DATA_DIR`, then the
/// current directory (with a warning).
pub fn resolve_csv_dir(configured: Option<&Path>) -> PathBuf {
    if let Some(dir) = configured {
        return dir.to_path_buf();
    }
    match std::env::var_os(CSV_DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            tracing::warn!(
                env = CSV_DATA_DIR_ENV,
                "no CSV data directory configured; using the current working directory"
            );
            PathBuf::from(".")
        }
    }
}

/// Parse one ticker's CSV file.
pub fn read_csv_bars(path: &Path, ticker: &str) -> Result<Vec<DailyBar>, DataError> {
    if !path.is_file() {
        return Err(DataError::MissingFile {
            ticker: ticker.to_string(),
            path: path.to_path_buf(),
        });
    }
    let csv_err = |source| DataError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let mut bars = Vec::new();
    let mut skipped = 0usize;
    for row in reader.deserialize::<YahooRow>() {
        match row.map_err(csv_err)?.into_bar() {
            Some(bar) => bars.push(bar),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!(ticker, skipped, "skipped CSV rows with missing prices");
    }
    Ok(bars)
}

/// Load `<dir>/<TICKER>.csv` for every ticker into an in-memory handler.
pub fn load_csv_dir<S: AsRef<str>>(
    dir: &Path,
    tickers: &[S],
) -> Result<BarDataHandler, DataError> {
    let mut handler = BarDataHandler::new();
    for ticker in tickers {
        let ticker = ticker.as_ref();
        let path = dir.join(format!("{ticker}.csv"));
        let bars = read_csv_bars(&path, ticker)?;
        tracing::debug!(ticker, bars = bars.len(), path = %path.display(), "loaded daily bars");
        handler.insert_bars(ticker, bars)?;
    }
    Ok(handler)
}
