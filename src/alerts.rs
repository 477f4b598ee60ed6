use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::Outcome;
use crate::stats::StatsSnapshot;

/// Why a critical alert was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriticalReason {
    /// Probing keeps failing but the monitor is still running
    SustainedFailure {
        consecutive_failures: u32,
        last_success: DateTime<Utc>,
        since_last_success: chrono::Duration,
    },
    /// The monitor is stopping after too many consecutive probe failures
    TooManyErrors {
        consecutive_errors: u32,
        max_errors: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    Availability {
        slots: u64,
        date: String,
        timestamp: DateTime<Utc>,
        method: String,
        booking_url: Option<String>,
    },
    DetectionError {
        date: String,
        timestamp: DateTime<Utc>,
        method: String,
    },
    Critical {
        reason: CriticalReason,
        stats: StatsSnapshot,
    },
    HourlySummary {
        text: String,
    },
    StartNotice {
        date: String,
        interval: Duration,
        method: String,
    },
    StopNotice {
        stats: StatsSnapshot,
    },
}

impl Alert {
    pub fn availability(outcome: &Outcome, booking_url: Option<&str>) -> Alert {
        Alert::Availability {
            slots: u64::try_from(outcome.available_slots).unwrap_or(0),
            date: outcome.target_date.clone(),
            timestamp: outcome.timestamp,
            method: outcome.method.clone(),
            booking_url: booking_url.map(String::from),
        }
    }

    pub fn detection_error(outcome: &Outcome) -> Alert {
        Alert::DetectionError {
            date: outcome.target_date.clone(),
            timestamp: outcome.timestamp,
            method: outcome.method.clone(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Alert::Availability { .. } => "availability",
            Alert::DetectionError { .. } => "detection-error",
            Alert::Critical { .. } => "critical",
            Alert::HourlySummary { .. } => "hourly-summary",
            Alert::StartNotice { .. } => "start",
            Alert::StopNotice { .. } => "stop",
        }
    }

    /// One-line title, used as email subject.
    pub fn title(&self) -> String {
        match self {
            Alert::Availability { slots, date, .. } => {
                format!("🎉 SLOTS AVAILABLE - {date} ({slots})")
            }
            Alert::DetectionError { date, .. } => format!("⚠️ Detection error - {date}"),
            Alert::Critical {
                reason: CriticalReason::TooManyErrors { .. },
                ..
            } => String::from("🚨 CRITICAL - monitor stopped"),
            Alert::Critical { .. } => String::from("🚨 CRITICAL - probing keeps failing"),
            Alert::HourlySummary { .. } => String::from("📊 Hourly summary"),
            Alert::StartNotice { date, .. } => format!("🤖 Monitor started - {date}"),
            Alert::StopNotice { .. } => String::from("🛑 Monitor stopped"),
        }
    }

    /// Channel-agnostic text body.
    pub fn render(&self) -> String {
        match self {
            Alert::Availability {
                slots,
                date,
                timestamp,
                method,
                booking_url,
            } => {
                let link = booking_url
                    .as_ref()
                    .map(|url| format!("\n\n🔗 {url}"))
                    .unwrap_or_default();
                format!(
                    "🚨 SLOTS AVAILABLE! 🚨\n\n\
                     📅 Date: {date}\n\
                     🎫 Available slots: {slots}\n\
                     ⏰ Checked: {}\n\
                     🔧 Method: {method}{link}\n\n\
                     Book now before they are gone!",
                    timestamp.format("%Y-%m-%d %H:%M:%S")
                )
            }
            Alert::DetectionError {
                date,
                timestamp,
                method,
            } => format!(
                "⚠️ Detection error\n\n\
                 📅 Target date: {date}\n\
                 ⏰ Timestamp: {}\n\
                 🔧 Method: {method}\n\n\
                 The probe ran but could not determine the number of slots. \
                 Monitoring continues automatically.",
                timestamp.format("%Y-%m-%d %H:%M:%S")
            ),
            Alert::Critical { reason, stats } => {
                let details = match reason {
                    CriticalReason::SustainedFailure {
                        consecutive_failures,
                        last_success,
                        since_last_success,
                    } => format!(
                        "⚠️ No usable reading for {} ({consecutive_failures} failed attempts in a row).\n\
                         ✅ Last successful check: {}\n\n\
                         The monitor is still running and will keep trying.",
                        format_elapsed(*since_last_success),
                        last_success.format("%Y-%m-%d %H:%M:%S")
                    ),
                    CriticalReason::TooManyErrors {
                        consecutive_errors,
                        max_errors,
                    } => format!(
                        "❌ The monitor stopped after {consecutive_errors}/{max_errors} consecutive probe failures.\n\n\
                         ⚠️ It will NOT restart by itself."
                    ),
                };
                format!(
                    "🚨 CRITICAL ERROR 🚨\n\n{details}\n\n📊 Session statistics:\n{}",
                    stats.session_summary()
                )
            }
            Alert::HourlySummary { text } => {
                format!("{text}\n\n🤖 Monitor running normally")
            }
            Alert::StartNotice {
                date,
                interval,
                method,
            } => format!(
                "🤖 Monitor started\n\n\
                 📅 Target date: {date}\n\
                 ⏱️ Interval: {}s\n\
                 🔧 Method: {method}\n\n\
                 Monitoring begins now.",
                interval.as_secs()
            ),
            Alert::StopNotice { stats } => format!(
                "🛑 Monitor stopped\n\n\
                 ⏰ Stopped at: {}\n\n\
                 📊 Final statistics:\n{}",
                stats.taken_at.format("%H:%M:%S"),
                stats.global_summary()
            ),
        }
    }
}

fn format_elapsed(elapsed: chrono::Duration) -> String {
    let seconds = elapsed.num_seconds().max(0);
    match (seconds / 3600, (seconds % 3600) / 60, seconds % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}
