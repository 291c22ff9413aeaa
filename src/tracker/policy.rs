//! Broken-State Policy
//!
//! Two independent trips over calendar-day windows ending today:
//!
//! - **fatal trip**: a FATAL outcome dated within the last `fatal_window` days.
//! - **sustained error trip**: at least `min_error_days` of the last
//!   `slow_window` days saw errors and no success. A day without traffic has
//!   no bucket, so it counts against the run.
//!
//! The integration is broken if either trip fires. Both are pure functions so
//! the thresholds can be tuned and tested independently.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::bucket::{retention_cutoff, DayBucket};
use crate::domain::ports::FeatureFlags;
use crate::error::{Error, Result};

/// Thresholds for the broken-state decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokenPolicy {
    /// Days, ending today, searched for a FATAL outcome.
    pub fatal_window: usize,
    /// Days, ending today, examined by the sustained error trip.
    pub slow_window: usize,
    /// Error-only days within `slow_window` needed to trip.
    pub min_error_days: usize,
}

impl Default for BrokenPolicy {
    fn default() -> Self {
        Self {
            fatal_window: 1,
            slow_window: 7,
            min_error_days: 7,
        }
    }
}

/// Why an integration is considered broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "trip", rename_all = "snake_case")]
pub enum BrokenReason {
    /// A fatal outcome was recorded on `date`.
    Fatal { date: NaiveDate },
    /// `error_days` recent days saw only errors.
    SustainedErrors { error_days: usize },
}

impl std::fmt::Display for BrokenReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokenReason::Fatal { date } => write!(f, "fatal outcome on {}", date),
            BrokenReason::SustainedErrors { error_days } => {
                write!(f, "{} days of errors without a success", error_days)
            }
        }
    }
}

/// Derived health of an integration. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenState {
    pub broken: bool,
    pub reason: Option<BrokenReason>,
}

impl BrokenState {
    pub fn healthy() -> Self {
        Self {
            broken: false,
            reason: None,
        }
    }

    pub fn broken(reason: BrokenReason) -> Self {
        Self {
            broken: true,
            reason: Some(reason),
        }
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }
}

/// Buckets of the newest-first `buckets` dated within the `window` days
/// ending `today`.
fn within_days(
    buckets: &[DayBucket],
    today: NaiveDate,
    window: usize,
) -> impl Iterator<Item = &DayBucket> {
    let start = retention_cutoff(today, window);
    buckets
        .iter()
        .skip_while(move |bucket| bucket.date > today)
        .take_while(move |bucket| window > 0 && bucket.date >= start)
}

/// Date of the newest FATAL outcome within the `window` days ending `today`.
pub fn fatal_trip(buckets: &[DayBucket], today: NaiveDate, window: usize) -> Option<NaiveDate> {
    within_days(buckets, today, window)
        .find(|bucket| bucket.has_fatal())
        .map(|bucket| bucket.date)
}

/// Number of error-only days within the `window` days ending `today`, if it
/// reaches `min_error_days`.
pub fn sustained_error_trip(
    buckets: &[DayBucket],
    today: NaiveDate,
    window: usize,
    min_error_days: usize,
) -> Option<usize> {
    if min_error_days == 0 {
        return None;
    }
    let error_days = within_days(buckets, today, window)
        .filter(|bucket| bucket.is_error_only())
        .count();
    (error_days >= min_error_days).then_some(error_days)
}

impl BrokenPolicy {
    /// Evaluate the newest-first `buckets` as of `today`.
    pub fn evaluate(&self, buckets: &[DayBucket], today: NaiveDate) -> BrokenState {
        if let Some(date) = fatal_trip(buckets, today, self.fatal_window) {
            return BrokenState::broken(BrokenReason::Fatal { date });
        }
        if let Some(error_days) =
            sustained_error_trip(buckets, today, self.slow_window, self.min_error_days)
        {
            return BrokenState::broken(BrokenReason::SustainedErrors { error_days });
        }
        BrokenState::healthy()
    }

    /// Check the thresholds against a retention of `buffer_days` buckets.
    pub fn validate(&self, buffer_days: usize) -> Result<()> {
        if self.fatal_window == 0 || self.fatal_window > buffer_days {
            return Err(Error::Config(format!(
                "fatal_window must be within 1..={}, got {}",
                buffer_days, self.fatal_window
            )));
        }
        if self.slow_window == 0 || self.slow_window > buffer_days {
            return Err(Error::Config(format!(
                "slow_window must be within 1..={}, got {}",
                buffer_days, self.slow_window
            )));
        }
        if self.min_error_days == 0 || self.min_error_days > self.slow_window {
            return Err(Error::Config(format!(
                "min_error_days must be within 1..={}, got {}",
                self.slow_window, self.min_error_days
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Disable Policy
// =============================================================================

/// Whether a broken integration may be disabled automatically.
///
/// Passed into each `maybe_disable` call rather than read from global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisablePolicy {
    pub auto_disable: bool,
}

impl DisablePolicy {
    pub fn enabled() -> Self {
        Self { auto_disable: true }
    }

    pub fn disabled() -> Self {
        Self {
            auto_disable: false,
        }
    }

    /// Resolve the policy from a feature flag for `scope`.
    ///
    /// A failed lookup resolves to auto-disable off.
    pub async fn resolve(flags: &dyn FeatureFlags, flag: &str, scope: &str) -> Self {
        match flags.is_enabled(flag, scope).await {
            Ok(auto_disable) => Self { auto_disable },
            Err(e) => {
                warn!(flag = %flag, scope = %scope, error = %e, "Feature flag lookup failed, auto-disable off");
                Self::disabled()
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
