pub mod alerts;
pub mod clock;
pub mod config;
pub mod monitors;
pub mod notify;
pub mod probe;
pub mod stats;
pub mod util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Slot count reported by a probe that ran but could not determine a count.
pub const DETECTION_ERROR: i64 = -1;

/// Result of one probe attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub available_slots: i64,
    pub timestamp: DateTime<Utc>,
    pub target_date: String,
    pub method: String,
}

/// Interpretation of [`Outcome::available_slots`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    Count(u64),
    DetectionError,
}

impl Outcome {
    pub fn new(
        available_slots: i64,
        timestamp: DateTime<Utc>,
        target_date: impl ToString,
        method: impl ToString,
    ) -> Self {
        Self {
            available_slots,
            timestamp,
            target_date: target_date.to_string(),
            method: method.to_string(),
        }
    }

    /// Outcome of a probe that ran but could not read a count.
    pub fn detection_error(
        timestamp: DateTime<Utc>,
        target_date: impl ToString,
        method: impl ToString,
    ) -> Self {
        Self::new(DETECTION_ERROR, timestamp, target_date, method)
    }

    pub fn reading(&self) -> Reading {
        // any negative value is out of range, not only the canonical sentinel
        if self.available_slots < 0 {
            Reading::DetectionError
        } else {
            Reading::Count(self.available_slots as u64)
        }
    }

    pub fn is_detection_error(&self) -> bool {
        self.reading() == Reading::DetectionError
    }

    pub fn has_availability(&self) -> bool {
        self.available_slots > 0
    }
}
