//! Early warning for sustained probing trouble
//!
//! ## Decision table
//!
//! ```text
//! failures < threshold AND since_success < time_threshold  → Escalation::Quiet
//! condition met, last alert younger than cooldown          → Escalation::CoolingDown
//! condition met, no alert yet or cooldown elapsed          → Escalation::Fire
//! ```
//!
//! The policy is independent from the hard `max_errors` stop: it looks at
//! failed and undetermined attempts alike, and it keeps the monitor running.

use chrono::{DateTime, Duration, Utc};

use crate::config::MonitorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    Quiet,
    CoolingDown { remaining: Duration },
    Fire,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationPolicy {
    pub failure_threshold: u32,
    pub time_threshold: Duration,
    pub cooldown: Duration,
}

impl EscalationPolicy {
    pub fn new(failure_threshold: u32, time_threshold: Duration, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            time_threshold,
            cooldown,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(
            config.critical_error_threshold,
            Duration::seconds(
                i64::try_from(config.critical_error_time_threshold).unwrap_or(i64::MAX),
            ),
            Duration::seconds(i64::try_from(config.critical_alert_cooldown).unwrap_or(i64::MAX)),
        )
    }

    pub fn is_critical(
        &self,
        consecutive_failures: u32,
        last_success: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        consecutive_failures >= self.failure_threshold || now - last_success >= self.time_threshold
    }

    pub fn evaluate(
        &self,
        consecutive_failures: u32,
        last_success: DateTime<Utc>,
        last_alert: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Escalation {
        if !self.is_critical(consecutive_failures, last_success, now) {
            return Escalation::Quiet;
        }

        match last_alert {
            Some(sent) if now - sent < self.cooldown => Escalation::CoolingDown {
                remaining: self.cooldown - (now - sent),
            },
            _ => Escalation::Fire,
        }
    }
}
