//! The probe loop
//!
//! One cycle probes once, updates the two failure counters, records the
//! attempt, dispatches alerts and finally checks whether an hour boundary
//! was crossed since the last summary.
//!
//! ```text
//! probe failed     → errors += 1, failures += 1, record(0, error), escalate,
//!                    stop when errors >= max_errors
//! detection error  → errors = 0, failures += 1, record(0, error), escalate
//! count == 0       → errors = 0, failures = 0, record(0)
//! count > 0        → errors = 0, failures = 0, record(n), availability alert
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use super::escalation::{Escalation, EscalationPolicy};
use crate::alerts::{Alert, CriticalReason};
use crate::clock::{Clock, truncate_to_hour};
use crate::config::Config;
use crate::notify::NotificationDispatcher;
use crate::probe::Prober;
use crate::stats::StatsEngine;
use crate::{DETECTION_ERROR, Reading};

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub target_date: String,
    pub interval: Duration,
    pub max_errors: u32,
    pub retention_days: u32,
    pub escalation: EscalationPolicy,
}

impl MonitorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_date: config.target.date.clone(),
            interval: config.monitor.interval(),
            max_errors: config.monitor.max_errors,
            retention_days: config.monitor.retention_days,
            escalation: EscalationPolicy::from_config(&config.monitor),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorState {
    /// Probe failures in a row; reset by any outcome
    pub consecutive_errors: u32,
    /// Attempts without a real count in a row; reset only by a real count
    pub consecutive_failures: u32,
    pub last_successful_check: DateTime<Utc>,
    pub last_critical_alert_at: Option<DateTime<Utc>>,
    pub last_hourly_report_hour: DateTime<Utc>,
}

impl MonitorState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            consecutive_errors: 0,
            consecutive_failures: 0,
            last_successful_check: now,
            last_critical_alert_at: None,
            last_hourly_report_hour: truncate_to_hour(now),
        }
    }

    /// How the most recent cycle ended.
    ///
    /// Any outcome resets `consecutive_errors` and a real count resets
    /// `consecutive_failures`, so the two counters identify the last cycle.
    pub fn last_cycle(&self) -> CycleResult {
        if self.consecutive_errors > 0 {
            CycleResult::ProbeFailed
        } else if self.consecutive_failures > 0 {
            CycleResult::DetectionError
        } else {
            CycleResult::Count
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleResult {
    Count,
    DetectionError,
    ProbeFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TooManyErrors,
    Cancelled,
}

pub struct Monitor {
    settings: MonitorSettings,
    prober: Box<dyn Prober>,
    stats: StatsEngine,
    dispatcher: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    state: MonitorState,
}

impl Monitor {
    pub fn new(
        settings: MonitorSettings,
        prober: Box<dyn Prober>,
        stats: StatsEngine,
        dispatcher: NotificationDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = MonitorState::new(clock.now());
        Self {
            settings,
            prober,
            stats,
            dispatcher,
            clock,
            state,
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn stats(&self) -> &StatsEngine {
        &self.stats
    }

    /// Run one probe cycle. Returns `false` once the monitor must stop.
    #[instrument(skip(self))]
    pub async fn run_cycle(&mut self) -> bool {
        let result = self.prober.check().await;
        let now = self.clock.now();

        match result {
            Err(e) => {
                self.state.consecutive_errors += 1;
                self.state.consecutive_failures += 1;
                warn!(
                    "probe failed ({}/{}): {e}",
                    self.state.consecutive_errors, self.settings.max_errors
                );

                self.stats.record_attempt(0, true).await;
                self.escalate(now).await;

                if self.state.consecutive_errors >= self.settings.max_errors {
                    error!(
                        "stopping after {} consecutive probe failures",
                        self.state.consecutive_errors
                    );
                    self.send_fatal_alert(now).await;
                    return false;
                }
            }
            Ok(outcome) => {
                self.state.consecutive_errors = 0;

                match outcome.reading() {
                    Reading::DetectionError => {
                        self.state.consecutive_failures += 1;
                        self.stats.record_attempt(DETECTION_ERROR, true).await;
                        warn!(
                            "{}",
                            Alert::detection_error(&outcome).render().replace('\n', " ")
                        );
                        self.escalate(now).await;
                    }
                    Reading::Count(slots) => {
                        self.state.consecutive_failures = 0;
                        self.state.last_successful_check = now;
                        self.stats.record_attempt(outcome.available_slots, false).await;

                        if slots > 0 {
                            info!("{slots} slots available for {}", outcome.target_date);
                            self.dispatcher.send_availability_alert(&outcome).await;
                        } else {
                            info!("no slots available for {}", outcome.target_date);
                        }
                    }
                }
            }
        }

        self.check_hourly_report().await;
        true
    }

    async fn escalate(&mut self, now: DateTime<Utc>) {
        let evaluation = self.settings.escalation.evaluate(
            self.state.consecutive_failures,
            self.state.last_successful_check,
            self.state.last_critical_alert_at,
            now,
        );

        match evaluation {
            Escalation::Quiet => {}
            Escalation::CoolingDown { remaining } => {
                debug!(
                    "critical condition persists, next alert possible in {}s",
                    remaining.num_seconds()
                );
            }
            Escalation::Fire => {
                let alert = Alert::Critical {
                    reason: CriticalReason::SustainedFailure {
                        consecutive_failures: self.state.consecutive_failures,
                        last_success: self.state.last_successful_check,
                        since_last_success: now - self.state.last_successful_check,
                    },
                    stats: self.stats.snapshot(),
                };
                error!(
                    "critical condition: {} failed attempts, last success at {}",
                    self.state.consecutive_failures, self.state.last_successful_check
                );
                self.dispatcher.send_critical_alert(&alert).await;
                self.state.last_critical_alert_at = Some(now);
            }
        }
    }

    async fn send_fatal_alert(&mut self, now: DateTime<Utc>) {
        let alert = Alert::Critical {
            reason: CriticalReason::TooManyErrors {
                consecutive_errors: self.state.consecutive_errors,
                max_errors: self.settings.max_errors,
            },
            stats: self.stats.snapshot(),
        };
        if !self.dispatcher.send_critical_alert(&alert).await {
            warn!("fatal stop could not be announced on any channel");
        }
        self.state.last_critical_alert_at = Some(now);
    }

    async fn check_hourly_report(&mut self) {
        let hour = truncate_to_hour(self.clock.now());
        if hour == self.state.last_hourly_report_hour {
            return;
        }

        let label = format!(
            "Hourly summary {}",
            (hour - chrono::Duration::hours(1)).format("%H:00")
        );
        let summary = self
            .stats
            .previous_hour_summary()
            .map(|bucket| StatsEngine::format_summary(bucket, &label));

        match summary {
            Some(text) => {
                if self.dispatcher.send_hourly_summary(&text).await {
                    info!("hourly summary sent");
                } else {
                    warn!("hourly summary could not be delivered");
                }
            }
            None => debug!("no data for the previous hour, skipping summary"),
        }

        self.state.last_hourly_report_hour = hour;
        self.stats.cleanup_older_than(self.settings.retention_days).await;
    }

    /// Loop until the stop condition is reached or `shutdown` resolves.
    ///
    /// Shutdown is only observed between cycles. Stats are flushed and the
    /// prober is closed on every exit path.
    pub async fn run_until<F>(&mut self, shutdown: F) -> StopReason
    where
        F: Future<Output = ()>,
    {
        info!(
            "monitoring {} every {}s using {}",
            self.settings.target_date,
            self.settings.interval.as_secs(),
            self.prober.method()
        );
        let start = Alert::StartNotice {
            date: self.settings.target_date.clone(),
            interval: self.settings.interval,
            method: self.prober.method().to_string(),
        };
        self.dispatcher.send_notice(&start).await;

        tokio::pin!(shutdown);
        let reason = loop {
            if !self.run_cycle().await {
                break StopReason::TooManyErrors;
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => break StopReason::Cancelled,
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        };

        if reason == StopReason::Cancelled {
            info!("shutdown requested");
            let stop = Alert::StopNotice {
                stats: self.stats.snapshot(),
            };
            self.dispatcher.send_notice(&stop).await;
        }

        self.finish().await;
        reason
    }

    /// Run until the stop condition or Ctrl-C.
    ///
    /// The interrupt handler is installed before the start notice goes out,
    /// so a Ctrl-C at any point ends in the regular shutdown path.
    pub async fn run(&mut self) -> StopReason {
        let interrupted = interrupt_signal().await;
        self.run_until(interrupted).await
    }

    /// Flush stats and release the prober.
    pub async fn finish(&mut self) {
        if !self.stats.flush().await {
            warn!("final stats flush failed");
        }
        self.prober.close().await;
        info!("monitor stopped");
    }
}

/// Installs a Ctrl-C handler and returns a future completing on interrupt.
///
/// The handler is in place once this returns. When it cannot be installed
/// the returned future never completes.
#[cfg(unix)]
pub async fn interrupt_signal() -> impl Future<Output = ()> + Send + 'static {
    use tokio::signal::unix::{SignalKind, signal};

    let registered = signal(SignalKind::interrupt());
    async move {
        match registered {
            Ok(mut interrupt) => {
                interrupt.recv().await;
            }
            Err(e) => {
                error!("unable to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
pub async fn interrupt_signal() -> impl Future<Output = ()> + Send + 'static {
    let (notify, interrupted) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = notify.send(());
            }
            Err(e) => error!("unable to listen for shutdown signal: {e}"),
        }
    });
    // the listener registers its handler on first poll
    tokio::task::yield_now().await;
    async move {
        if interrupted.await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
