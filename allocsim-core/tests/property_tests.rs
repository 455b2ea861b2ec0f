//! Property tests for schedule and allocation invariants.
//!
//! 1. Schedules are strictly increasing and land on business days at the anchor
//! 2. Weekly schedules only contain the configured weekday
//! 3. Monthly schedules hold at most one instant per month
//! 4. Allocation construction accepts exactly the valid inputs
//! 5. Flat fees never depend on the trade direction

use allocsim_core::domain::{Allocation, AllocationError, WEIGHT_SUM_TOLERANCE};
use allocsim_core::exchange::is_business_day;
use allocsim_core::fees::{FeeModel, FlatFeeModel};
use allocsim_core::schedule::{generate, MarketAnchor, RebalancePeriod};
use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use proptest::prelude::*;
use std::collections::BTreeSet;

// ── Strategies ───────────────────────────────────────────────────────

fn arb_range() -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
    (0i64..3_000, 0i64..400).prop_map(|(offset, len)| {
        let base = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let start = base + Duration::days(offset);
        (start, start + Duration::days(len))
    })
}

fn arb_period() -> impl Strategy<Value = RebalancePeriod> {
    prop_oneof![
        Just(RebalancePeriod::Daily),
        Just(RebalancePeriod::Weekly),
        Just(RebalancePeriod::Monthly),
        Just(RebalancePeriod::Never),
    ]
}

fn arb_weekday() -> impl Strategy<Value = Weekday> {
    prop_oneof![
        Just(Weekday::Mon),
        Just(Weekday::Tue),
        Just(Weekday::Wed),
        Just(Weekday::Thu),
        Just(Weekday::Fri),
    ]
}

fn arb_anchor() -> impl Strategy<Value = MarketAnchor> {
    prop_oneof![Just(MarketAnchor::Open), Just(MarketAnchor::Close)]
}

fn midnight(d: NaiveDate) -> chrono::DateTime<Utc> {
    Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).unwrap())
}

// ── 1–3. Schedules ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn schedule_is_strictly_increasing_on_business_days(
        (start, end) in arb_range(),
        period in arb_period(),
        weekday in arb_weekday(),
        anchor in arb_anchor(),
    ) {
        let schedule = generate(&midnight(start), &midnight(end), period, Some(weekday), anchor).unwrap();

        prop_assert!(schedule.instants().windows(2).all(|w| w[0] < w[1]));
        for ts in schedule.iter() {
            prop_assert!(is_business_day(ts.date_naive()));
            prop_assert_eq!(ts.time(), anchor.time());
            prop_assert!(schedule.contains(ts));
        }
        if period != RebalancePeriod::Never {
            for ts in schedule.iter() {
                prop_assert!(ts.date_naive() >= start && ts.date_naive() <= end);
            }
        } else {
            prop_assert_eq!(schedule.len(), 1);
        }
    }

    #[test]
    fn weekly_schedule_uses_only_the_weekday(
        (start, end) in arb_range(),
        weekday in arb_weekday(),
    ) {
        let schedule = generate(
            &midnight(start),
            &midnight(end),
            RebalancePeriod::Weekly,
            Some(weekday),
            MarketAnchor::Close,
        )
        .unwrap();
        prop_assert!(schedule.iter().all(|ts| ts.weekday() == weekday));
        for w in schedule.instants().windows(2) {
            prop_assert_eq!((w[1] - w[0]).num_days(), 7);
        }
    }

    #[test]
    fn monthly_schedule_has_one_instant_per_month(
        (start, end) in arb_range(),
    ) {
        let schedule = generate(
            &midnight(start),
            &midnight(end),
            RebalancePeriod::Monthly,
            None,
            MarketAnchor::Close,
        )
        .unwrap();
        let months: BTreeSet<(i32, u32)> =
            schedule.iter().map(|ts| (ts.year(), ts.month())).collect();
        prop_assert_eq!(months.len(), schedule.len());
        for ts in schedule.iter() {
            // the next business day is in another month
            let mut next = ts.date_naive().succ_opt().unwrap();
            while !is_business_day(next) {
                next = next.succ_opt().unwrap();
            }
            prop_assert_ne!(next.month(), ts.month());
        }
    }
}

// ── 4. Allocations ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn positive_weights_normalized_are_accepted(
        raw in prop::collection::vec(0.01f64..100.0, 1..12),
    ) {
        let total: f64 = raw.iter().sum();
        let pairs: Vec<(String, f64)> = raw
            .iter()
            .enumerate()
            .map(|(i, w)| (format!("T{i}"), w / total))
            .collect();
        let alloc = Allocation::new(pairs.clone()).unwrap();
        prop_assert_eq!(alloc.len(), pairs.len());
        let sum: f64 = alloc.weights().iter().sum();
        prop_assert!((sum - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
    }

    #[test]
    fn unnormalized_weights_are_rejected(
        raw in prop::collection::vec(0.01f64..100.0, 1..12),
        scale in 1.01f64..10.0,
    ) {
        let total: f64 = raw.iter().sum();
        let pairs: Vec<(String, f64)> = raw
            .iter()
            .enumerate()
            .map(|(i, w)| (format!("T{i}"), w / total * scale))
            .collect();
        let is_sum_mismatch = matches!(
            Allocation::new(pairs),
            Err(AllocationError::WeightSumMismatch { .. })
        );
        prop_assert!(is_sum_mismatch);
    }

    #[test]
    fn any_non_positive_weight_is_rejected(
        raw in prop::collection::vec(0.01f64..1.0, 1..8),
        bad in -1.0f64..=0.0,
        at in 0usize..8,
    ) {
        let mut pairs: Vec<(String, f64)> =
            raw.iter().enumerate().map(|(i, w)| (format!("T{i}"), *w)).collect();
        let idx = at % pairs.len();
        pairs[idx].1 = bad;
        let is_non_positive = matches!(
            Allocation::new(pairs),
            Err(AllocationError::NonPositiveWeight { .. })
        );
        prop_assert!(is_non_positive);
    }
}

// ── 5. Fees ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn flat_fee_is_direction_independent(
        qty in 1.0f64..10_000.0,
        price in 1.0f64..1_000.0,
        fee in 0.0f64..0.1,
        tax in 0.0f64..0.1,
    ) {
        let model = FlatFeeModel::new(fee, tax).unwrap();
        let buy = model.calc_total_cost("X", qty, qty * price, None);
        let sell = model.calc_total_cost("X", -qty, -qty * price, None);
        prop_assert_eq!(buy, sell);
        prop_assert!(buy >= 0.0);
    }
}
