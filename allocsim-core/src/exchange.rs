//! Simulated exchange: market hours and business-day arithmetic.
//!
//! Hours are fixed NYSE regular-session times expressed in UTC (14:30–21:00).
//! Business days are Monday–Friday; there is no holiday calendar.

use crate::domain::Timestamp;
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

/// Regular-session open in UTC.
pub fn market_open_time() -> NaiveTime {
    NaiveTime::from_hms_opt(14, 30, 0).expect("14:30:00 is a valid time")
}

/// Regular-session close in UTC.
pub fn market_close_time() -> NaiveTime {
    NaiveTime::from_hms_opt(21, 0, 0).expect("21:00:00 is a valid time")
}

/// Monday through Friday.
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// First business day strictly after `date`.
pub fn next_business_day(date: NaiveDate) -> Option<NaiveDate> {
    let mut day = date.succ_opt()?;
    while !is_business_day(day) {
        day = day.succ_opt()?;
    }
    Some(day)
}

/// `date` itself when it is a business day, otherwise the next one.
pub fn business_day_on_or_after(date: NaiveDate) -> Option<NaiveDate> {
    if is_business_day(date) {
        Some(date)
    } else {
        next_business_day(date)
    }
}

/// Last Monday–Friday date of the given month.
pub fn last_business_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let mut day = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
    while !is_business_day(day) {
        day = day.pred_opt()?;
    }
    Some(day)
}

/// Every date in `[start, end]`, inclusive.
pub fn calendar_days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Every business day in `[start, end]`, inclusive.
pub fn business_days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    calendar_days(start, end).filter(|d| is_business_day(*d))
}

/// `(year, month)` pairs for every calendar month touching `[start, end]`.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = (i32, u32)> {
    let first = start.year() * 12 + start.month0() as i32;
    let last = end.year() * 12 + end.month0() as i32;
    (first..=last).map(|m| (m.div_euclid(12), m.rem_euclid(12) as u32 + 1))
}

/// Venue model used by the broker to decide when queued orders may execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedExchange {
    open: NaiveTime,
    close: NaiveTime,
}

impl SimulatedExchange {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self { open, close }
    }

    /// Open on business days for `open <= t < close`.
    pub fn is_open_at(&self, ts: Timestamp) -> bool {
        if !is_business_day(ts.date_naive()) {
            return false;
        }
        let time = ts.time();
        self.open <= time && time < self.close
    }

    pub fn open_time(&self) -> NaiveTime {
        self.open
    }

    pub fn close_time(&self) -> NaiveTime {
        self.close
    }
}

impl Default for SimulatedExchange {
    fn default() -> Self {
        Self::new(market_open_time(), market_close_time())
    }
}
