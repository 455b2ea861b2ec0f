//! Asset universe: the set of tickers a strategy may trade.

use serde::{Deserialize, Serialize};

/// A fixed list of tickers for the whole replay.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticUniverse {
    assets: Vec<String>,
}

impl StaticUniverse {
    /// Build a universe, dropping repeated tickers but keeping first-seen order.
    pub fn new<I, S>(assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for asset in assets {
            let asset = asset.into();
            if !unique.contains(&asset) {
                unique.push(asset);
            }
        }
        Self { assets: unique }
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn contains(&self, asset: &str) -> bool {
        self.assets.iter().any(|a| a == asset)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_dropped_in_order() {
        let universe = StaticUniverse::new(["SPY", "AGG", "SPY"]);
        assert_eq!(universe.assets(), &["SPY".to_string(), "AGG".to_string()]);
        assert!(universe.contains("AGG"));
        assert!(!universe.contains("QQQ"));
    }
}
