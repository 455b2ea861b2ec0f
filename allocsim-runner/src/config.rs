//! Run files: a session configuration plus the universe and strategy to replay.
//!
//! ```toml
//! universe = ["SPY", "AGG"]
//!
//! [session]
//! start = "2020-01-01"
//! end = "2023-12-31"
//! rebalance = "monthly"
//! long_only = true
//! cash_buffer_percentage = 0.05
//!
//! [strategy]
//! type = "static_weights"
//! weights = { SPY = 0.6, AGG = 0.4 }
//! ```

use std::path::Path;

use allocsim_core::config::SessionConfig;
use allocsim_core::domain::{Allocation, StaticUniverse};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("failed to read run file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse run file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("universe must list at least one ticker")]
    EmptyUniverse,

    #[error("strategy weights mention '{0}', which is not in the universe")]
    TickerOutsideUniverse(String),

    #[error("momentum lookback must be at least 1")]
    ZeroLookback,

    #[error("momentum top_n must be at least 1")]
    ZeroTopN,

    #[error("risk weight cap must be in (0, 1], got {0}")]
    InvalidWeightCap(f64),
}

/// How target weights are produced at each rebalance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Fixed weights, validated as an [`Allocation`].
    StaticWeights { weights: Allocation },

    /// 1/N over the universe.
    EqualWeight,

    /// Equal weight over the `top_n` assets with the best trailing return.
    Momentum { lookback: usize, top_n: usize },
}

impl StrategyConfig {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StaticWeights { .. } => "static_weights",
            Self::EqualWeight => "equal_weight",
            Self::Momentum { .. } => "momentum",
        }
    }
}

/// Optional risk overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Largest weight any single asset may carry.
    pub max_weight: f64,
}

/// Everything needed to reproduce one replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFile {
    pub session: SessionConfig,
    pub universe: StaticUniverse,
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub risk: Option<RiskConfig>,
}

impl RunFile {
    /// Parse and check a run file held in memory.
    pub fn from_toml(text: &str) -> Result<Self, RunConfigError> {
        let run: RunFile = toml::from_str(text)?;
        run.validate()?;
        Ok(run)
    }

    /// Read, parse and check a run file on disk.
    pub fn load(path: &Path) -> Result<Self, RunConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| RunConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Checks that span the universe and the strategy. Session settings are
    /// validated when the session is built.
    pub fn validate(&self) -> Result<(), RunConfigError> {
        if self.universe.is_empty() {
            return Err(RunConfigError::EmptyUniverse);
        }
        match &self.strategy {
            StrategyConfig::StaticWeights { weights } => {
                if let Some(ticker) = weights.keys().find(|t| !self.universe.contains(t)) {
                    return Err(RunConfigError::TickerOutsideUniverse(ticker.to_string()));
                }
            }
            StrategyConfig::Momentum { lookback, top_n } => {
                if *lookback == 0 {
                    return Err(RunConfigError::ZeroLookback);
                }
                if *top_n == 0 {
                    return Err(RunConfigError::ZeroTopN);
                }
            }
            StrategyConfig::EqualWeight => {}
        }
        if let Some(risk) = self.risk {
            if !(risk.max_weight > 0.0 && risk.max_weight <= 1.0) {
                return Err(RunConfigError::InvalidWeightCap(risk.max_weight));
            }
        }
        Ok(())
    }
}
