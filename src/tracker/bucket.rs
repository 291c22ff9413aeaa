//! Day Buckets
//!
//! An integration's request log is stored as one counter-store key with one
//! field per `(day, kind)` pair, e.g. `2024-03-01:error`. This module turns
//! those raw fields into ordered [`DayBucket`]s and decides which fields
//! have aged out of the retention window.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::ports::{IntegrationKey, OutcomeKind};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One day's aggregated outcome counters for one integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub success_count: u64,
    pub error_count: u64,
    pub fatal_count: u64,
}

impl DayBucket {
    /// Empty bucket for `date`.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            success_count: 0,
            error_count: 0,
            fatal_count: 0,
        }
    }

    /// Counter for `kind`.
    pub fn count(&self, kind: OutcomeKind) -> u64 {
        match kind {
            OutcomeKind::Success => self.success_count,
            OutcomeKind::Error => self.error_count,
            OutcomeKind::Fatal => self.fatal_count,
        }
    }

    /// Add `n` outcomes of `kind`.
    pub fn add(&mut self, kind: OutcomeKind, n: u64) {
        let counter = match kind {
            OutcomeKind::Success => &mut self.success_count,
            OutcomeKind::Error => &mut self.error_count,
            OutcomeKind::Fatal => &mut self.fatal_count,
        };
        *counter = counter.saturating_add(n);
    }

    pub fn has_fatal(&self) -> bool {
        self.fatal_count > 0
    }

    /// Errors were seen and nothing succeeded that day.
    pub fn is_error_only(&self) -> bool {
        self.error_count > 0 && self.success_count == 0
    }

    pub fn total(&self) -> u64 {
        self.success_count
            .saturating_add(self.error_count)
            .saturating_add(self.fatal_count)
    }
}

/// Store field name for one day's counter of `kind`.
pub fn field_name(date: NaiveDate, kind: OutcomeKind) -> String {
    format!("{}:{}", date.format(DATE_FORMAT), kind)
}

/// Inverse of [`field_name`]. Returns `None` for foreign or malformed fields.
pub fn parse_field(field: &str) -> Option<(NaiveDate, OutcomeKind)> {
    let (date, kind) = field.split_once(':')?;
    let date = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
    let kind = kind.parse().ok()?;
    Some((date, kind))
}

/// Oldest date still inside a `buffer_days` window ending on `today`.
pub fn retention_cutoff(today: NaiveDate, buffer_days: usize) -> NaiveDate {
    let span = buffer_days.saturating_sub(1) as u64;
    today.checked_sub_days(Days::new(span)).unwrap_or(NaiveDate::MIN)
}

/// Dates kept for a `buffer_days` window: not older than the cutoff and at
/// most `buffer_days` of them, newest first.
fn retained_dates(
    dates: impl IntoIterator<Item = NaiveDate>,
    today: NaiveDate,
    buffer_days: usize,
) -> BTreeSet<NaiveDate> {
    let cutoff = retention_cutoff(today, buffer_days);
    dates
        .into_iter()
        .filter(|date| *date >= cutoff)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .rev()
        .take(buffer_days)
        .collect()
}

/// Fields of `fields` whose day has fallen out of the retention window.
///
/// Fields that do not parse are left alone; they are not ours to delete.
pub fn expired_fields(
    fields: &HashMap<String, u64>,
    today: NaiveDate,
    buffer_days: usize,
) -> Vec<String> {
    let parsed: Vec<(&String, NaiveDate)> = fields
        .keys()
        .filter_map(|field| parse_field(field).map(|(date, _)| (field, date)))
        .collect();

    let keep = retained_dates(parsed.iter().map(|(_, date)| *date), today, buffer_days);

    let mut expired: Vec<String> = parsed
        .into_iter()
        .filter(|(_, date)| !keep.contains(date))
        .map(|(field, _)| field.clone())
        .collect();
    expired.sort();
    expired
}

/// Per-integration sequence of day buckets, newest first.
///
/// Invariants: each date appears once, dates strictly decrease, and at most
/// `buffer_days` buckets are held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrationRequestLog {
    key: IntegrationKey,
    buckets: Vec<DayBucket>,
}

impl IntegrationRequestLog {
    /// Empty log for `key`.
    pub fn empty(key: IntegrationKey) -> Self {
        Self {
            key,
            buckets: Vec::new(),
        }
    }

    /// Build the log from raw store fields as seen on `today`.
    pub fn from_fields(
        key: IntegrationKey,
        fields: &HashMap<String, u64>,
        today: NaiveDate,
        buffer_days: usize,
    ) -> Self {
        let mut by_date: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();

        for (field, count) in fields {
            match parse_field(field) {
                Some((date, kind)) => by_date
                    .entry(date)
                    .or_insert_with(|| DayBucket::new(date))
                    .add(kind, *count),
                None => debug!(integration = %key, field = %field, "Skipping unknown field"),
            }
        }

        let keep = retained_dates(by_date.keys().copied(), today, buffer_days);
        let buckets = by_date
            .into_values()
            .rev()
            .filter(|bucket| keep.contains(&bucket.date))
            .collect();

        Self { key, buckets }
    }

    pub fn key(&self) -> &IntegrationKey {
        &self.key
    }

    /// Buckets, newest first.
    pub fn buckets(&self) -> &[DayBucket] {
        &self.buckets
    }

    /// The most recent bucket, if any outcome is retained.
    pub fn latest(&self) -> Option<&DayBucket> {
        self.buckets.first()
    }

    /// Bucket for a specific date.
    pub fn bucket(&self, date: NaiveDate) -> Option<&DayBucket> {
        self.buckets.iter().find(|bucket| bucket.date == date)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn fields(entries: &[(&str, u64)]) -> HashMap<String, u64> {
        entries
            .iter()
            .map(|(field, count)| (field.to_string(), *count))
            .collect()
    }

    #[test]
    fn test_field_name_roundtrip() {
        let field = field_name(day(5), OutcomeKind::Fatal);
        assert_eq!(field, "2024-03-05:fatal");
        assert_eq!(parse_field(&field), Some((day(5), OutcomeKind::Fatal)));
    }

    #[test]
    fn test_parse_field_rejects_garbage() {
        assert_eq!(parse_field("2024-03-05"), None);
        assert_eq!(parse_field("2024-13-05:error"), None);
        assert_eq!(parse_field("2024-03-05:warning"), None);
        assert_eq!(parse_field("last_seen:error"), None);
    }

    #[test]
    fn test_day_bucket_counts() {
        let mut bucket = DayBucket::new(day(1));
        bucket.add(OutcomeKind::Error, 2);
        assert!(bucket.is_error_only());
        assert!(!bucket.has_fatal());

        bucket.add(OutcomeKind::Success, 1);
        assert!(!bucket.is_error_only());

        bucket.add(OutcomeKind::Fatal, 1);
        assert!(bucket.has_fatal());
        assert_eq!(bucket.count(OutcomeKind::Error), 2);
        assert_eq!(bucket.total(), 4);
    }

    #[test]
    fn test_retention_cutoff() {
        assert_eq!(retention_cutoff(day(30), 30), day(1));
        assert_eq!(retention_cutoff(day(30), 1), day(30));
        assert_eq!(retention_cutoff(day(30), 0), day(30));
    }

    #[test]
    fn test_log_groups_and_orders_buckets() {
        let raw = fields(&[
            ("2024-03-01:error", 3),
            ("2024-03-03:success", 1),
            ("2024-03-03:error", 1),
            ("2024-03-02:fatal", 1),
            ("unrelated", 9),
        ]);

        let log = IntegrationRequestLog::from_fields("k".into(), &raw, day(3), 30);

        assert_eq!(log.len(), 3);
        let dates: Vec<_> = log.buckets().iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![day(3), day(2), day(1)]);

        let latest = log.latest().unwrap();
        assert_eq!(latest.success_count, 1);
        assert_eq!(latest.error_count, 1);
        assert_eq!(log.bucket(day(1)).unwrap().error_count, 3);
        assert!(log.bucket(day(2)).unwrap().has_fatal());
    }

    #[test]
    fn test_log_drops_buckets_outside_window() {
        let raw = fields(&[
            ("2024-03-01:error", 1),
            ("2024-03-02:error", 1),
            ("2024-03-10:error", 1),
        ]);

        let log = IntegrationRequestLog::from_fields("k".into(), &raw, day(10), 9);
        let dates: Vec<_> = log.buckets().iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![day(10), day(2)]);
    }

    #[test]
    fn test_expired_fields() {
        let raw = fields(&[
            ("2024-03-01:error", 1),
            ("2024-03-01:success", 1),
            ("2024-03-02:error", 1),
            ("2024-03-10:error", 1),
            ("garbage", 1),
        ]);

        let expired = expired_fields(&raw, day(10), 9);
        assert_eq!(expired, vec!["2024-03-01:error", "2024-03-01:success"]);

        assert!(expired_fields(&raw, day(10), 30).is_empty());
    }

    #[test]
    fn test_expired_fields_caps_future_dated_buckets() {
        // A worker with a skewed clock can write a day ahead of ours.
        let raw = fields(&[
            ("2024-03-08:error", 1),
            ("2024-03-09:error", 1),
            ("2024-03-10:error", 1),
        ]);

        let expired = expired_fields(&raw, day(9), 2);
        assert_eq!(expired, vec!["2024-03-08:error"]);
    }

    #[test]
    fn test_empty_log() {
        let log = IntegrationRequestLog::empty("k".into());
        assert!(log.is_empty());
        assert!(log.latest().is_none());
        assert_eq!(log.key().as_str(), "k");
    }
}
