//! Hour-bucketed probe statistics
//!
//! [`StatsEngine`] owns the only [`StatsStore`] of the process. Every probe
//! attempt is recorded into the lifetime totals and into the bucket of its
//! truncated hour, then the whole store is written through the configured
//! [`StatsBackend`].
//!
//! ## Failure handling
//!
//! - A failed write is logged; the in-memory store stays authoritative and
//!   the next successful write catches the backend up.
//! - An unreadable store at startup is treated as no prior history.
//!
//! ## Retention
//!
//! Buckets are only pruned by an explicit [`StatsEngine::cleanup_older_than`]
//! call, which the monitor issues once per hourly report.

pub mod backend;
pub mod error;
pub mod file;
pub mod memory;
pub mod schema;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::clock::{Clock, truncate_to_hour};

pub use backend::StatsBackend;
pub use error::{StatsError, StatsResult};
pub use file::JsonFileBackend;
pub use memory::MemoryBackend;
pub use schema::{HourBucket, SessionTotals, StatsSnapshot, StatsStore};

/// Window covered by the session part of a snapshot
const SESSION_WINDOW_HOURS: i64 = 24;

pub struct StatsEngine {
    store: StatsStore,
    backend: Box<dyn StatsBackend>,
    clock: Arc<dyn Clock>,
}

impl StatsEngine {
    /// Load the store from `backend`, starting fresh if nothing usable is there.
    pub async fn load(backend: Box<dyn StatsBackend>, clock: Arc<dyn Clock>) -> Self {
        let store = match backend.load().await {
            Ok(Some(store)) => {
                info!(
                    "loaded stats from {} ({} attempts, {} hour buckets)",
                    backend.describe(),
                    store.total_attempts,
                    store.hourly_data.len()
                );
                store
            }
            Ok(None) => {
                debug!("no stats found in {}, starting fresh", backend.describe());
                StatsStore::new(clock.now())
            }
            Err(e) => {
                warn!(
                    "stats in {} are unreadable ({e}), starting fresh",
                    backend.describe()
                );
                StatsStore::new(clock.now())
            }
        };

        Self {
            store,
            backend,
            clock,
        }
    }

    pub fn store(&self) -> &StatsStore {
        &self.store
    }

    /// Record one probe attempt and persist the store.
    #[instrument(skip(self))]
    pub async fn record_attempt(&mut self, slots: i64, had_error: bool) {
        let now = self.clock.now();
        self.store
            .record(now, truncate_to_hour(now), slots, had_error);
        self.persist().await;
    }

    /// Bucket of the given hour, or of the current hour when `None`.
    pub fn get_summary(&self, hour: Option<DateTime<Utc>>) -> Option<&HourBucket> {
        let hour = truncate_to_hour(hour.unwrap_or_else(|| self.clock.now()));
        self.store.bucket(hour)
    }

    pub fn current_hour_summary(&self) -> Option<&HourBucket> {
        self.get_summary(None)
    }

    pub fn previous_hour_summary(&self) -> Option<&HourBucket> {
        let previous = truncate_to_hour(self.clock.now()) - Duration::hours(1);
        self.store.bucket(previous)
    }

    pub fn format_summary(bucket: &HourBucket, label: &str) -> String {
        format!(
            "📊 {label} ({} - {})\n\n\
             🔍 Attempts: {}\n\
             🎫 Total slots checked: {}\n\
             📈 Average slots: {:.1}\n\
             🏆 Max slots: {}\n\
             📉 Min slots: {}\n\
             ✅ Times with availability: {}\n\
             ❌ Errors: {}",
            bucket.bucket_start.format("%Y-%m-%d %H:%M"),
            bucket.last_updated.format("%Y-%m-%d %H:%M"),
            bucket.attempts,
            bucket.total_slots,
            bucket.average_slots(),
            bucket.max_slots,
            bucket.min_slots_or_zero(),
            bucket.availability_found,
            bucket.errors
        )
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let now = self.clock.now();
        let since = truncate_to_hour(now - Duration::hours(SESSION_WINDOW_HOURS));

        StatsSnapshot {
            taken_at: now,
            start_date: self.store.start_date,
            total_attempts: self.store.total_attempts,
            total_slots_checked: self.store.total_slots_checked,
            max_slots_found: self.store.max_slots_found,
            availability_found_count: self.store.availability_found_count,
            total_errors: self.store.total_errors,
            session: self.store.session_since(since),
        }
    }

    pub fn global_summary(&self) -> String {
        self.snapshot().global_summary()
    }

    pub fn session_summary(&self) -> String {
        self.snapshot().session_summary()
    }

    /// Drop buckets whose hour precedes `now - days`; returns how many went.
    #[instrument(skip(self))]
    pub async fn cleanup_older_than(&mut self, days: u32) -> usize {
        let cutoff = truncate_to_hour(self.clock.now() - Duration::days(i64::from(days)));
        let removed = self.store.prune_before(cutoff);

        if removed > 0 {
            info!("removed {removed} hour buckets older than {days} days");
            self.persist().await;
        }

        removed
    }

    /// Write the current store, reporting whether the write succeeded.
    pub async fn flush(&self) -> bool {
        self.persist().await
    }

    async fn persist(&self) -> bool {
        match self.backend.save(&self.store).await {
            Ok(()) => true,
            Err(e) => {
                error!("failed to persist stats to {}: {e}", self.backend.describe());
                false
            }
        }
    }
}
