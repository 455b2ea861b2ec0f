//! Rebalance schedule: the precomputed instants at which the strategy runs.
//!
//! The schedule is generated once per session and then only queried by exact
//! instant membership. Every instant is a UTC timestamp stamped at one of the
//! two fixed market anchors, so the event stream and the schedule share a
//! single comparison domain.

use crate::config::ConfigError;
use crate::domain::Timestamp;
use crate::exchange::{
    business_day_on_or_after, business_days, calendar_days, last_business_day_of_month,
    market_close_time, market_open_time, months_between,
};
use chrono::{Datelike, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// How often the strategy is re-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebalancePeriod {
    Daily,
    #[default]
    Weekly,
    Monthly,
    /// Evaluate once, on the first business day of the range. The instant's
    /// time of day comes from the market anchor, not from the range start.
    Never,
}

/// Which fixed market instant a rebalance is stamped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketAnchor {
    /// 14:30 UTC
    Open,
    /// 21:00 UTC
    #[default]
    Close,
}

impl MarketAnchor {
    pub fn time(self) -> NaiveTime {
        match self {
            Self::Open => market_open_time(),
            Self::Close => market_close_time(),
        }
    }
}

/// Strictly increasing set of rebalance instants.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RebalanceSchedule {
    instants: Vec<Timestamp>,
}

impl RebalanceSchedule {
    /// Build from arbitrary instants; sorts and removes duplicates.
    pub fn from_instants(mut instants: Vec<Timestamp>) -> Self {
        instants.sort_unstable();
        instants.dedup();
        Self { instants }
    }

    /// Exact-instant membership. Total: never fails, never approximates.
    pub fn contains(&self, ts: &Timestamp) -> bool {
        self.instants.binary_search(ts).is_ok()
    }

    pub fn instants(&self) -> &[Timestamp] {
        &self.instants
    }

    pub fn iter(&self) -> impl Iterator<Item = &Timestamp> {
        self.instants.iter()
    }

    pub fn len(&self) -> usize {
        self.instants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instants.is_empty()
    }

    pub fn first(&self) -> Option<Timestamp> {
        self.instants.first().copied()
    }

    pub fn last(&self) -> Option<Timestamp> {
        self.instants.last().copied()
    }
}

/// Generate the rebalance instants for `[start, end]`.
///
/// Inputs in any timezone are converted to UTC before their dates are taken.
/// `weekday` is required for [`RebalancePeriod::Weekly`] and ignored otherwise.
pub fn generate<Tz: TimeZone>(
    start: &chrono::DateTime<Tz>,
    end: &chrono::DateTime<Tz>,
    period: RebalancePeriod,
    weekday: Option<Weekday>,
    anchor: MarketAnchor,
) -> Result<RebalanceSchedule, ConfigError> {
    let start_date = start.with_timezone(&Utc).date_naive();
    let end_date = end.with_timezone(&Utc).date_naive();
    if end_date < start_date {
        return Err(ConfigError::InvalidDateRange {
            start: start_date,
            end: end_date,
        });
    }

    let dates = rebalance_dates(start_date, end_date, period, weekday)?;
    let time = anchor.time();
    let instants = dates
        .into_iter()
        .map(|d| Utc.from_utc_datetime(&d.and_time(time)))
        .collect();

    Ok(RebalanceSchedule { instants })
}

fn rebalance_dates(
    start: NaiveDate,
    end: NaiveDate,
    period: RebalancePeriod,
    weekday: Option<Weekday>,
) -> Result<Vec<NaiveDate>, ConfigError> {
    let dates = match period {
        RebalancePeriod::Daily => business_days(start, end).collect(),
        RebalancePeriod::Weekly => {
            let weekday = weekday.ok_or(ConfigError::MissingRebalanceWeekday)?;
            if matches!(weekday, Weekday::Sat | Weekday::Sun) {
                return Err(ConfigError::WeekendRebalanceWeekday(weekday));
            }
            calendar_days(start, end)
                .filter(|d| d.weekday() == weekday)
                .collect()
        }
        RebalancePeriod::Monthly => months_between(start, end)
            .filter_map(|(year, month)| last_business_day_of_month(year, month))
            .filter(|d| *d >= start && *d <= end)
            .collect(),
        RebalancePeriod::Never => business_day_on_or_after(start).into_iter().collect(),
    };
    Ok(dates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::is_business_day;
    use chrono::{FixedOffset, Timelike};

    fn utc(y: i32, m: u32, d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn daily_is_every_business_day_at_close() {
        let schedule = generate(
            &utc(2024, 1, 1),
            &utc(2024, 1, 14),
            RebalancePeriod::Daily,
            None,
            MarketAnchor::Close,
        )
        .unwrap();
        assert_eq!(schedule.len(), 10);
        for ts in schedule.iter() {
            assert!(is_business_day(ts.date_naive()));
            assert_eq!((ts.hour(), ts.minute(), ts.second()), (21, 0, 0));
        }
    }

    #[test]
    fn daily_at_open() {
        let schedule = generate(
            &utc(2024, 1, 2),
            &utc(2024, 1, 2),
            RebalancePeriod::Daily,
            None,
            MarketAnchor::Open,
        )
        .unwrap();
        assert_eq!(
            schedule.instants(),
            &[Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap()]
        );
    }

    #[test]
    fn weekly_wednesdays_are_seven_days_apart() {
        let schedule = generate(
            &utc(2024, 1, 1),
            &utc(2024, 3, 31),
            RebalancePeriod::Weekly,
            Some(Weekday::Wed),
            MarketAnchor::Close,
        )
        .unwrap();
        assert_eq!(schedule.len(), 13);
        assert!(schedule.iter().all(|ts| ts.weekday() == Weekday::Wed));
        for pair in schedule.instants().windows(2) {
            assert_eq!((pair[1] - pair[0]).num_days(), 7);
        }
    }

    #[test]
    fn weekly_without_weekday_fails() {
        let err = generate(
            &utc(2024, 1, 1),
            &utc(2024, 3, 31),
            RebalancePeriod::Weekly,
            None,
            MarketAnchor::Close,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::MissingRebalanceWeekday);
    }

    #[test]
    fn weekly_on_weekend_fails() {
        let err = generate(
            &utc(2024, 1, 1),
            &utc(2024, 3, 31),
            RebalancePeriod::Weekly,
            Some(Weekday::Sat),
            MarketAnchor::Close,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::WeekendRebalanceWeekday(Weekday::Sat));
    }

    #[test]
    fn monthly_is_last_business_day() {
        let schedule = generate(
            &utc(2024, 1, 1),
            &utc(2024, 6, 30),
            RebalancePeriod::Monthly,
            None,
            MarketAnchor::Close,
        )
        .unwrap();
        let dates: Vec<NaiveDate> = schedule.iter().map(|ts| ts.date_naive()).collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 1, 31),
                date(2024, 2, 29),
                date(2024, 3, 29),
                date(2024, 4, 30),
                date(2024, 5, 31),
                date(2024, 6, 28),
            ]
        );
    }

    #[test]
    fn monthly_drops_month_end_after_range() {
        let schedule = generate(
            &utc(2024, 1, 15),
            &utc(2024, 3, 15),
            RebalancePeriod::Monthly,
            None,
            MarketAnchor::Close,
        )
        .unwrap();
        let dates: Vec<NaiveDate> = schedule.iter().map(|ts| ts.date_naive()).collect();
        assert_eq!(dates, vec![date(2024, 1, 31), date(2024, 2, 29)]);
    }

    #[test]
    fn never_uses_start_when_business_day() {
        let schedule = generate(
            &utc(2024, 1, 2),
            &utc(2024, 6, 30),
            RebalancePeriod::Never,
            None,
            MarketAnchor::Close,
        )
        .unwrap();
        assert_eq!(
            schedule.instants(),
            &[Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap()]
        );
    }

    #[test]
    fn never_takes_time_of_day_from_anchor() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 10, 15, 0).unwrap();
        let schedule = generate(
            &start,
            &utc(2024, 6, 30),
            RebalancePeriod::Never,
            None,
            MarketAnchor::Open,
        )
        .unwrap();
        assert_eq!(
            schedule.instants(),
            &[Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap()]
        );
        assert!(!schedule.contains(&start));
    }

    #[test]
    fn never_rolls_weekend_start_forward() {
        let schedule = generate(
            &utc(2024, 1, 6),
            &utc(2024, 6, 30),
            RebalancePeriod::Never,
            None,
            MarketAnchor::Open,
        )
        .unwrap();
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.first().unwrap().date_naive(), date(2024, 1, 8));
    }

    #[test]
    fn inverted_range_fails() {
        let err = generate(
            &utc(2024, 2, 1),
            &utc(2024, 1, 1),
            RebalancePeriod::Daily,
            None,
            MarketAnchor::Close,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDateRange { .. }));
    }

    #[test]
    fn non_utc_inputs_are_normalized() {
        // 2024-01-01 22:00 at UTC-05:00 is 2024-01-02 03:00 UTC
        let est = FixedOffset::west_opt(5 * 3600).unwrap();
        let start = est.with_ymd_and_hms(2024, 1, 1, 22, 0, 0).unwrap();
        let end = est.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
        let schedule = generate(&start, &end, RebalancePeriod::Daily, None, MarketAnchor::Close)
            .unwrap();
        assert_eq!(
            schedule.instants(),
            &[Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap()]
        );
    }

    #[test]
    fn membership_is_exact() {
        let schedule = generate(
            &utc(2024, 1, 1),
            &utc(2024, 1, 31),
            RebalancePeriod::Monthly,
            None,
            MarketAnchor::Close,
        )
        .unwrap();
        let hit = Utc.with_ymd_and_hms(2024, 1, 31, 21, 0, 0).unwrap();
        let near = Utc.with_ymd_and_hms(2024, 1, 31, 21, 0, 1).unwrap();
        assert!(schedule.contains(&hit));
        assert!(!schedule.contains(&near));
        assert!(!schedule.contains(&utc(2024, 1, 31)));
    }
}
