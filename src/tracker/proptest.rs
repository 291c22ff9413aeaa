//! Property-Based Tests for Health Tracking
//!
//! Uses proptest to check the request log and broken-state policy across
//! randomly generated outcome histories.
//!
//! # Test Properties
//!
//! 1. **Log Shape**: buckets are unique, newest first and bounded
//! 2. **Retention**: no bucket is older than the retention cutoff
//! 3. **Success Resets**: a success inside the slow window prevents the slow trip
//! 4. **Fatal Dominance**: a fatal today always trips
//! 5. **Calendar Windows**: with idle days in the history, the policy trips
//!    only on a fatal today or seven error-only calendar days ending today
//! 6. **Bounded Storage**: recording over many days never exceeds the window

#![cfg(test)]

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Days, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

use super::bucket::{self, DayBucket, IntegrationRequestLog};
use super::config::TrackerConfig;
use super::engine::IntegrationHealthTracker;
use super::policy::{sustained_error_trip, BrokenPolicy};
use crate::adapters::{InMemoryCounterStore, InMemoryLifecycleManager, ManualClock};
use crate::domain::ports::{CounterStore, IntegrationKey, OutcomeKind};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

// =============================================================================
// Property Strategies
// =============================================================================

fn kind_strategy() -> impl Strategy<Value = OutcomeKind> {
    prop_oneof![
        Just(OutcomeKind::Success),
        Just(OutcomeKind::Error),
        Just(OutcomeKind::Fatal),
    ]
}

/// Raw store fields spread over the last 60 days.
fn fields_strategy() -> impl Strategy<Value = HashMap<String, u64>> {
    prop::collection::vec((0u64..60, kind_strategy(), 1u64..100), 0..120).prop_map(|entries| {
        let mut fields = HashMap::new();
        for (days_ago, kind, count) in entries {
            let date = today() - Days::new(days_ago);
            *fields.entry(bucket::field_name(date, kind)).or_insert(0) += count;
        }
        fields
    })
}

/// Newest-first buckets with arbitrary error/success mix and no fatals.
fn buckets_strategy(len: usize) -> impl Strategy<Value = Vec<DayBucket>> {
    prop::collection::vec((0u64..5, 0u64..5), len).prop_map(|counts| {
        counts
            .into_iter()
            .enumerate()
            .map(|(i, (success, error))| {
                let mut bucket = DayBucket::new(today() - Days::new(i as u64));
                bucket.add(OutcomeKind::Success, success);
                bucket.add(OutcomeKind::Error, error);
                bucket
            })
            .collect()
    })
}

/// Newest-first buckets separated by random runs of idle days. The newest
/// bucket may itself be a few days old.
fn sparse_buckets_strategy() -> impl Strategy<Value = Vec<DayBucket>> {
    prop::collection::vec((0u64..3, 0u64..3, 0u64..4, 0u64..2), 0..20).prop_map(|days| {
        let mut age = 0;
        days.into_iter()
            .map(|(gap, success, error, fatal)| {
                age += gap;
                let mut bucket = DayBucket::new(today() - Days::new(age));
                bucket.add(OutcomeKind::Success, success);
                bucket.add(OutcomeKind::Error, error);
                bucket.add(OutcomeKind::Fatal, fatal);
                age += 1;
                bucket
            })
            .collect()
    })
}

/// Bucket dated `days_ago` before today, if that day saw traffic.
fn bucket_on(buckets: &[DayBucket], days_ago: u64) -> Option<&DayBucket> {
    let date = today() - Days::new(days_ago);
    buckets.iter().find(|bucket| bucket.date == date)
}

// =============================================================================
// Request Log Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: the log is strictly newest first and never exceeds the window.
    #[test]
    fn prop_log_is_sorted_and_bounded(
        fields in fields_strategy(),
        buffer_days in 1usize..=40,
    ) {
        let log = IntegrationRequestLog::from_fields(
            IntegrationKey::new("k"),
            &fields,
            today(),
            buffer_days,
        );

        prop_assert!(log.len() <= buffer_days);
        for pair in log.buckets().windows(2) {
            prop_assert!(pair[0].date > pair[1].date);
        }

        let cutoff = bucket::retention_cutoff(today(), buffer_days);
        for bucket in log.buckets() {
            prop_assert!(bucket.date >= cutoff);
            prop_assert!(bucket.date <= today());
        }
    }

    /// Property: expired fields and retained buckets partition the parsed fields.
    #[test]
    fn prop_expired_fields_match_log(
        fields in fields_strategy(),
        buffer_days in 1usize..=40,
    ) {
        let expired = bucket::expired_fields(&fields, today(), buffer_days);
        let log = IntegrationRequestLog::from_fields(
            IntegrationKey::new("k"),
            &fields,
            today(),
            buffer_days,
        );

        for field in &expired {
            let (date, _) = bucket::parse_field(field).unwrap();
            prop_assert!(log.bucket(date).is_none());
        }
        for field in fields.keys().filter(|f| !expired.contains(*f)) {
            let (date, _) = bucket::parse_field(field).unwrap();
            prop_assert!(log.bucket(date).is_some());
        }
    }
}

// =============================================================================
// Policy Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: any success inside the slow window prevents the slow trip.
    #[test]
    fn prop_success_in_window_prevents_slow_trip(
        mut buckets in buckets_strategy(7),
        success_at in 0usize..7,
    ) {
        buckets[success_at].add(OutcomeKind::Success, 1);

        let policy = BrokenPolicy::default();
        prop_assert!(
            sustained_error_trip(&buckets, today(), policy.slow_window, policy.min_error_days)
                .is_none()
        );
        prop_assert!(!policy.evaluate(&buckets, today()).is_broken());
    }

    /// Property: a fatal today trips regardless of history.
    #[test]
    fn prop_fatal_today_trips(mut buckets in buckets_strategy(10)) {
        buckets[0].add(OutcomeKind::Fatal, 1);
        prop_assert!(BrokenPolicy::default().evaluate(&buckets, today()).is_broken());
    }

    /// Property: without fatals, the policy trips exactly when the newest
    /// seven buckets are all error-only.
    #[test]
    fn prop_slow_trip_matches_error_only_days(buckets in buckets_strategy(12)) {
        let expected = buckets.iter().take(7).filter(|b| b.is_error_only()).count() == 7;
        prop_assert_eq!(
            BrokenPolicy::default().evaluate(&buckets, today()).is_broken(),
            expected
        );
    }

    /// Property: with idle days in the history, the default policy trips
    /// exactly on a fatal today or when each of the last seven calendar days
    /// saw errors and no success.
    #[test]
    fn prop_windows_follow_calendar_days(buckets in sparse_buckets_strategy()) {
        let fatal_today = bucket_on(&buckets, 0).is_some_and(|bucket| bucket.has_fatal());
        let error_week = (0..7).all(|days_ago| {
            bucket_on(&buckets, days_ago).is_some_and(|bucket| bucket.is_error_only())
        });

        let state = BrokenPolicy::default().evaluate(&buckets, today());
        prop_assert_eq!(state.is_broken(), fatal_today || error_week);
    }
}

// =============================================================================
// Tracker Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Property: recording over many days keeps storage within the window.
    #[test]
    fn prop_tracker_storage_is_bounded(
        days in prop::collection::vec(prop::collection::vec(kind_strategy(), 1..4), 1..50),
    ) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        let store = Arc::new(InMemoryCounterStore::with_clock(clock.clone()));
        let tracker = IntegrationHealthTracker::new(
            TrackerConfig::default(),
            store.clone(),
            Arc::new(InMemoryLifecycleManager::new()),
        )
        .unwrap()
        .with_clock(clock.clone());
        let key = IntegrationKey::for_integration("slack", 7);

        let (log_len, field_dates) = tokio_test::block_on(async {
            for kinds in &days {
                for kind in kinds {
                    tracker.record(&key, *kind).await;
                }
                clock.advance(chrono::Duration::days(1));
            }
            clock.advance(chrono::Duration::days(-1));

            let log = tracker.request_log(&key).await.unwrap();
            let fields = store.fields(key.as_str()).await.unwrap();
            let mut dates: Vec<NaiveDate> = fields
                .keys()
                .filter_map(|f| bucket::parse_field(f).map(|(date, _)| date))
                .collect();
            dates.sort();
            dates.dedup();
            (log.len(), dates.len())
        });

        prop_assert!(log_len <= tracker.config().buffer_days);
        prop_assert_eq!(log_len, days.len().min(tracker.config().buffer_days));
        prop_assert!(field_dates <= tracker.config().buffer_days);
    }
}
