//! Simulation engine: the chronological event stream a session replays.

use crate::domain::{EventType, SimulationEvent, Timestamp};
use crate::exchange::{business_days, market_close_time, market_open_time};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("simulation end date {end} is earlier than start date {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// Source of simulation events in non-decreasing timestamp order.
pub trait SimulationEngine: Send {
    /// Lazily iterate every event of the simulation.
    fn events(&self) -> Box<dyn Iterator<Item = SimulationEvent> + '_>;

    /// Times of day at which events are emitted on a business day.
    ///
    /// Used at session construction to check that every rebalance instant
    /// can actually be hit by an event.
    fn event_times(&self) -> Vec<NaiveTime>;
}

/// One set of market events per Monday–Friday date in the range.
///
/// Per business day: `pre_market` (00:00, optional), `market_open` (14:30),
/// `market_close` (21:00), `post_market` (23:59, optional), all UTC.
#[derive(Debug, Clone)]
pub struct DailyBusinessDaySimulationEngine {
    days: Vec<NaiveDate>,
    pre_market: bool,
    post_market: bool,
}

impl DailyBusinessDaySimulationEngine {
    pub fn new(
        start: Timestamp,
        end: Timestamp,
        pre_market: bool,
        post_market: bool,
    ) -> Result<Self, SimError> {
        let start = start.date_naive();
        let end = end.date_naive();
        if end < start {
            return Err(SimError::InvalidRange { start, end });
        }
        Ok(Self {
            days: business_days(start, end).collect(),
            pre_market,
            post_market,
        })
    }

    /// Number of business days covered.
    pub fn num_days(&self) -> usize {
        self.days.len()
    }

    fn schedule_for_day(&self) -> Vec<(NaiveTime, EventType)> {
        let mut slots = Vec::with_capacity(4);
        if self.pre_market {
            slots.push((NaiveTime::MIN, EventType::PreMarket));
        }
        slots.push((market_open_time(), EventType::MarketOpen));
        slots.push((market_close_time(), EventType::MarketClose));
        if self.post_market {
            if let Some(t) = NaiveTime::from_hms_opt(23, 59, 0) {
                slots.push((t, EventType::PostMarket));
            }
        }
        slots
    }
}

impl SimulationEngine for DailyBusinessDaySimulationEngine {
    fn events(&self) -> Box<dyn Iterator<Item = SimulationEvent> + '_> {
        let slots = self.schedule_for_day();
        Box::new(self.days.iter().flat_map(move |day| {
            slots
                .clone()
                .into_iter()
                .map(move |(time, ty)| {
                    SimulationEvent::new(Utc.from_utc_datetime(&day.and_time(time)), ty)
                })
        }))
    }

    fn event_times(&self) -> Vec<NaiveTime> {
        self.schedule_for_day().into_iter().map(|(t, _)| t).collect()
    }
}
