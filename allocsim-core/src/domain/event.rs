//! Simulation events: the timestamps the replay loop reacts to.

use super::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Market marker carried by a simulation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PreMarket,
    MarketOpen,
    MarketClose,
    PostMarket,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreMarket => "pre_market",
            Self::MarketOpen => "market_open",
            Self::MarketClose => "market_close",
            Self::PostMarket => "post_market",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dated market event produced by a simulation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationEvent {
    pub timestamp: Timestamp,
    pub event_type: EventType,
}

impl SimulationEvent {
    pub fn new(timestamp: Timestamp, event_type: EventType) -> Self {
        Self {
            timestamp,
            event_type,
        }
    }

    pub fn is_market_close(&self) -> bool {
        self.event_type == EventType::MarketClose
    }
}

impl fmt::Display for SimulationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) - {}", self.timestamp, self.event_type)
    }
}
