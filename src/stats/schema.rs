//! Persisted stats document
//!
//! The store is a flat set of lifetime counters plus one [`HourBucket`] per
//! truncated UTC hour, keyed by the ISO-8601 hour timestamp:
//!
//! ```text
//! {
//!   "total_attempts": 10,
//!   ...
//!   "start_date": "2025-08-02T09:12:44Z",
//!   "hourly_data": {
//!     "2025-08-02T09:00:00Z": { "attempts": 10, "min_slots": 0, ... }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregated counters for one clock hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourBucket {
    pub attempts: u64,
    pub total_slots: u64,
    pub max_slots: u64,
    /// `None` until the first attempt is recorded (stands for +∞)
    pub min_slots: Option<u64>,
    pub availability_found: u64,
    pub errors: u64,
    pub bucket_start: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl HourBucket {
    pub fn new(bucket_start: DateTime<Utc>) -> Self {
        Self {
            attempts: 0,
            total_slots: 0,
            max_slots: 0,
            min_slots: None,
            availability_found: 0,
            errors: 0,
            bucket_start,
            last_updated: bucket_start,
        }
    }

    fn record(&mut self, now: DateTime<Utc>, slots: u64, had_error: bool) {
        self.attempts += 1;
        self.total_slots += slots;
        self.max_slots = self.max_slots.max(slots);
        self.min_slots = Some(self.min_slots.map_or(slots, |min| min.min(slots)));
        self.last_updated = now;

        if slots > 0 {
            self.availability_found += 1;
        }
        if had_error {
            self.errors += 1;
        }
    }

    pub fn average_slots(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.total_slots as f64 / self.attempts as f64
    }

    /// Minimum observed count, 0 for a bucket without attempts.
    pub fn min_slots_or_zero(&self) -> u64 {
        self.min_slots.unwrap_or(0)
    }
}

/// Everything the stats engine persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsStore {
    pub total_attempts: u64,
    pub total_slots_checked: u64,
    pub max_slots_found: u64,
    pub availability_found_count: u64,
    pub total_errors: u64,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub hourly_data: BTreeMap<DateTime<Utc>, HourBucket>,
}

impl StatsStore {
    pub fn new(start_date: DateTime<Utc>) -> Self {
        Self {
            total_attempts: 0,
            total_slots_checked: 0,
            max_slots_found: 0,
            availability_found_count: 0,
            total_errors: 0,
            start_date,
            hourly_data: BTreeMap::new(),
        }
    }

    /// Records one attempt into the lifetime totals and the bucket of `hour`.
    ///
    /// Negative counts (the detection-error sentinel) contribute 0 to every
    /// slot aggregate while still counting as an attempt.
    pub fn record(
        &mut self,
        now: DateTime<Utc>,
        hour: DateTime<Utc>,
        slots: i64,
        had_error: bool,
    ) {
        let slots = u64::try_from(slots).unwrap_or(0);

        self.total_attempts += 1;
        self.total_slots_checked += slots;
        self.max_slots_found = self.max_slots_found.max(slots);
        if slots > 0 {
            self.availability_found_count += 1;
        }
        if had_error {
            self.total_errors += 1;
        }

        self.hourly_data
            .entry(hour)
            .or_insert_with(|| HourBucket::new(hour))
            .record(now, slots, had_error);
    }

    pub fn bucket(&self, hour: DateTime<Utc>) -> Option<&HourBucket> {
        self.hourly_data.get(&hour)
    }

    /// Removes every bucket whose hour precedes `cutoff`, returns how many.
    pub fn prune_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.hourly_data.len();
        self.hourly_data = self.hourly_data.split_off(&cutoff);
        before - self.hourly_data.len()
    }

    /// Aggregates the buckets starting at or after `since`.
    pub fn session_since(&self, since: DateTime<Utc>) -> SessionTotals {
        self.hourly_data
            .range(since..)
            .fold(SessionTotals::default(), |mut totals, (hour, bucket)| {
                totals.attempts += bucket.attempts;
                totals.errors += bucket.errors;
                totals.max_slots = totals.max_slots.max(bucket.max_slots);
                totals.availability_found += bucket.availability_found;
                totals.last_hour = Some(*hour);
                totals
            })
    }
}

/// Totals over a recent window of buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTotals {
    pub attempts: u64,
    pub errors: u64,
    pub max_slots: u64,
    pub availability_found: u64,
    pub last_hour: Option<DateTime<Utc>>,
}

impl SessionTotals {
    pub fn successful(&self) -> u64 {
        self.attempts.saturating_sub(self.errors)
    }
}

/// Copy of the counters at one instant, attached to critical and stop alerts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub taken_at: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
    pub total_attempts: u64,
    pub total_slots_checked: u64,
    pub max_slots_found: u64,
    pub availability_found_count: u64,
    pub total_errors: u64,
    pub session: SessionTotals,
}

impl StatsSnapshot {
    pub fn average_slots(&self) -> f64 {
        if self.total_attempts == 0 {
            return 0.0;
        }
        self.total_slots_checked as f64 / self.total_attempts as f64
    }

    pub fn global_summary(&self) -> String {
        format!(
            "🤖 Global summary\n\n\
             📅 Since: {}\n\
             🔍 Total attempts: {}\n\
             🎫 Total slots checked: {}\n\
             📈 Average slots: {:.1}\n\
             🏆 Max slots found: {}\n\
             ✅ Times with availability: {}\n\
             ❌ Total errors: {}",
            self.start_date.format("%Y-%m-%d %H:%M"),
            self.total_attempts,
            self.total_slots_checked,
            self.average_slots(),
            self.max_slots_found,
            self.availability_found_count,
            self.total_errors
        )
    }

    pub fn session_summary(&self) -> String {
        if self.session.attempts == 0 {
            return String::from("No recent data");
        }

        let last = self
            .session
            .last_hour
            .map(|hour| hour.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| String::from("N/A"));

        format!(
            "• Total attempts: {}\n\
             • Successful attempts: {}\n\
             • Errors: {}\n\
             • Max availability found: {} slots\n\
             • Times with availability: {}\n\
             • Last check: {}",
            self.session.attempts,
            self.session.successful(),
            self.session.errors,
            self.session.max_slots,
            self.session.availability_found,
            last
        )
    }
}
