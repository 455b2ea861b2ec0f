//! Session configuration and construction-time validation.
//!
//! `SessionConfig` is plain serde data so it can be embedded in a TOML run
//! file. Dates accept either an RFC 3339 instant (`"2024-01-31T21:00:00Z"`) or a
//! bare calendar date (`"2024-01-31"`, read as midnight UTC).

use crate::domain::Timestamp;
use crate::fees::{FeeModel, FeeModelError, FlatFeeModel, PercentFeeModel, ZeroFeeModel};
use crate::schedule::{MarketAnchor, RebalancePeriod};
use crate::trading::PortfolioMode;
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_INITIAL_CASH: f64 = 1_000_000.0;
pub const DEFAULT_ACCOUNT_NAME: &str = "Backtest Simulated Broker Account";
pub const DEFAULT_PORTFOLIO_ID: &str = "000001";
pub const DEFAULT_PORTFOLIO_NAME: &str = "Backtest Simulated Broker Portfolio";

/// Configuration problems detected before any event is processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error(
        "rebalance period is weekly but no rebalance weekday was given (e.g. rebalance_weekday = \"Wed\")"
    )]
    MissingRebalanceWeekday,

    #[error("rebalance weekday {0} is not a business day")]
    WeekendRebalanceWeekday(Weekday),

    #[error("long-only portfolio requested but no cash_buffer_percentage supplied")]
    MissingCashBuffer,

    #[error("long/short portfolio requested but no gross_leverage supplied")]
    MissingGrossLeverage,

    #[error("cash_buffer_percentage must be within [0, 1] (got {0})")]
    InvalidCashBuffer(f64),

    #[error("gross_leverage must be greater than zero (got {0})")]
    InvalidGrossLeverage(f64),

    #[error("initial_cash must be a non-negative number (got {0})")]
    InvalidInitialCash(f64),

    #[error("end date {end} is earlier than start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("rebalance instant {0} does not coincide with any simulation event time")]
    ScheduleOffEventGrid(Timestamp),

    #[error("fee model: {0}")]
    Fees(#[from] FeeModelError),
}

/// Transaction cost configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeeConfig {
    /// No transaction costs.
    #[default]
    Zero,

    /// Flat per-share commission and tax.
    Flat {
        #[serde(default)]
        fee_per_share: f64,
        #[serde(default)]
        tax_per_share: f64,
    },

    /// Fractions of consideration (0.0005 = 5 bps).
    Percent {
        #[serde(default)]
        commission_pct: f64,
        #[serde(default)]
        tax_pct: f64,
    },
}

impl FeeConfig {
    pub fn build(&self) -> Result<Box<dyn FeeModel>, FeeModelError> {
        Ok(match *self {
            Self::Zero => Box::new(ZeroFeeModel),
            Self::Flat {
                fee_per_share,
                tax_per_share,
            } => Box::new(FlatFeeModel::new(fee_per_share, tax_per_share)?),
            Self::Percent {
                commission_pct,
                tax_pct,
            } => Box::new(PercentFeeModel::new(commission_pct, tax_pct)?),
        })
    }
}

/// Every recognized session option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(deserialize_with = "de_timestamp")]
    pub start: Timestamp,

    #[serde(deserialize_with = "de_timestamp")]
    pub end: Timestamp,

    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,

    #[serde(default)]
    pub rebalance: RebalancePeriod,

    /// Required when `rebalance` is weekly.
    #[serde(default)]
    pub rebalance_weekday: Option<Weekday>,

    #[serde(default)]
    pub rebalance_anchor: MarketAnchor,

    #[serde(default = "default_account_name")]
    pub account_name: String,

    #[serde(default = "default_portfolio_id")]
    pub portfolio_id: String,

    #[serde(default = "default_portfolio_name")]
    pub portfolio_name: String,

    #[serde(default)]
    pub long_only: bool,

    /// Fraction of equity held back as cash; required when `long_only`.
    #[serde(default)]
    pub cash_buffer_percentage: Option<f64>,

    /// Target gross exposure / equity; required unless `long_only`.
    #[serde(default)]
    pub gross_leverage: Option<f64>,

    /// Events before this instant neither rebalance nor record.
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    pub burn_in: Option<Timestamp>,

    #[serde(default)]
    pub fees: FeeConfig,

    /// Directory of `<TICKER>.csv` daily bars for the default data handler.
    #[serde(default)]
    pub csv_data_dir: Option<PathBuf>,
}

impl SessionConfig {
    /// Config with every default applied.
    ///
    /// The default rebalance period is weekly and the default mode is
    /// long/short, so a weekday and a gross leverage must still be supplied
    /// before [`SessionConfig::validate`] passes.
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self {
            start,
            end,
            initial_cash: DEFAULT_INITIAL_CASH,
            rebalance: RebalancePeriod::default(),
            rebalance_weekday: None,
            rebalance_anchor: MarketAnchor::default(),
            account_name: DEFAULT_ACCOUNT_NAME.to_string(),
            portfolio_id: DEFAULT_PORTFOLIO_ID.to_string(),
            portfolio_name: DEFAULT_PORTFOLIO_NAME.to_string(),
            long_only: false,
            cash_buffer_percentage: None,
            gross_leverage: None,
            burn_in: None,
            fees: FeeConfig::default(),
            csv_data_dir: None,
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Check every construction-time requirement and derive the portfolio mode.
    pub fn validate(&self) -> Result<PortfolioMode, ConfigError> {
        let start = self.start.date_naive();
        let end = self.end.date_naive();
        if end < start {
            return Err(ConfigError::InvalidDateRange { start, end });
        }

        if !(self.initial_cash >= 0.0 && self.initial_cash.is_finite()) {
            return Err(ConfigError::InvalidInitialCash(self.initial_cash));
        }

        if self.rebalance == RebalancePeriod::Weekly && self.rebalance_weekday.is_none() {
            return Err(ConfigError::MissingRebalanceWeekday);
        }

        self.fees.build()?;

        if self.long_only {
            let buffer = self
                .cash_buffer_percentage
                .ok_or(ConfigError::MissingCashBuffer)?;
            if !(0.0..=1.0).contains(&buffer) {
                return Err(ConfigError::InvalidCashBuffer(buffer));
            }
            Ok(PortfolioMode::LongOnly {
                cash_buffer_percentage: buffer,
            })
        } else {
            let leverage = self.gross_leverage.ok_or(ConfigError::MissingGrossLeverage)?;
            if !(leverage > 0.0 && leverage.is_finite()) {
                return Err(ConfigError::InvalidGrossLeverage(leverage));
            }
            Ok(PortfolioMode::LongShort {
                gross_leverage: leverage,
            })
        }
    }
}

fn default_initial_cash() -> f64 {
    DEFAULT_INITIAL_CASH
}

fn default_account_name() -> String {
    DEFAULT_ACCOUNT_NAME.to_string()
}

fn default_portfolio_id() -> String {
    DEFAULT_PORTFOLIO_ID.to_string()
}

fn default_portfolio_name() -> String {
    DEFAULT_PORTFOLIO_NAME.to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimestampRepr {
    Instant(Timestamp),
    Date(NaiveDate),
}

impl TimestampRepr {
    fn into_timestamp(self) -> Timestamp {
        match self {
            Self::Instant(ts) => ts,
            Self::Date(date) => date.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }
}

fn de_timestamp<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    TimestampRepr::deserialize(deserializer).map(TimestampRepr::into_timestamp)
}

fn de_opt_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<TimestampRepr>::deserialize(deserializer).map(|o| o.map(TimestampRepr::into_timestamp))
}
