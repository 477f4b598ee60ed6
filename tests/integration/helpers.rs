//! Scripted prober, recording channels and a monitor harness

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use slotwatch::clock::{Clock, ManualClock};
use slotwatch::monitors::{EscalationPolicy, Monitor, MonitorSettings};
use slotwatch::notify::{
    BroadcastChannel, DirectChannel, DirectMessage, NotificationDispatcher, NotifyError,
    NotifyResult,
};
use slotwatch::probe::{ProbeError, ProbeResult, Prober};
use slotwatch::stats::{MemoryBackend, StatsEngine};
use slotwatch::{DETECTION_ERROR, Outcome};

pub const TARGET_DATE: &str = "02/08/2025";

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 2, 9, 15, 0).unwrap()
}

#[derive(Debug, Clone, Copy)]
pub enum Step {
    Fail,
    Slots(i64),
}

pub const SENTINEL: Step = Step::Slots(DETECTION_ERROR);

/// Replays a fixed script, moving the clock forward before every check.
/// An exhausted script keeps answering zero slots.
pub struct ScriptedProber {
    steps: VecDeque<Step>,
    clock: ManualClock,
    step_duration: chrono::Duration,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Prober for ScriptedProber {
    fn method(&self) -> &str {
        "scripted"
    }

    async fn check(&mut self) -> ProbeResult<Outcome> {
        self.clock.advance(self.step_duration);
        match self.steps.pop_front().unwrap_or(Step::Slots(0)) {
            Step::Fail => Err(ProbeError::Transport(String::from("connection refused"))),
            Step::Slots(slots) => Ok(Outcome::new(
                slots,
                self.clock.now(),
                TARGET_DATE,
                "scripted",
            )),
        }
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Broadcast channel that records every delivered message.
#[derive(Clone, Default)]
pub struct RecordingBroadcast {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
    pub failing: Vec<String>,
}

impl RecordingBroadcast {
    pub fn failing(recipients: &[&str]) -> Self {
        Self {
            failing: recipients.iter().map(|r| r.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Texts delivered to the first recipient, in order.
    pub fn texts(&self) -> Vec<String> {
        let sent = self.sent.lock().unwrap();
        let Some((first, _)) = sent.first() else {
            return Vec::new();
        };
        sent.iter()
            .filter(|(recipient, _)| recipient == first)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.texts().iter().filter(|t| t.contains(needle)).count()
    }
}

#[async_trait]
impl BroadcastChannel for RecordingBroadcast {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send_to(&self, recipient: &str, text: &str) -> NotifyResult<()> {
        if self.failing.iter().any(|r| r == recipient) {
            return Err(NotifyError::Rejected {
                status: 403,
                body: String::from("bot was blocked by the user"),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}

#[derive(Clone)]
pub struct RecordingDirect {
    name: &'static str,
    pub sent: Arc<Mutex<Vec<DirectMessage>>>,
    pub fail: bool,
}

impl RecordingDirect {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            sent: Arc::default(),
            fail: false,
        }
    }

    pub fn broken(name: &'static str) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.subject.clone())
            .collect()
    }
}

#[async_trait]
impl DirectChannel for RecordingDirect {
    fn name(&self) -> &str {
        self.name
    }

    async fn send(&self, message: &DirectMessage) -> NotifyResult<()> {
        if self.fail {
            return Err(NotifyError::Transport(String::from("connection reset")));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub fn settings() -> MonitorSettings {
    MonitorSettings {
        target_date: TARGET_DATE.to_string(),
        interval: Duration::from_millis(1),
        max_errors: 5,
        retention_days: 7,
        escalation: EscalationPolicy::new(
            600,
            chrono::Duration::seconds(600),
            chrono::Duration::seconds(300),
        ),
    }
}

pub struct Harness {
    pub clock: ManualClock,
    pub backend: MemoryBackend,
    pub broadcast: RecordingBroadcast,
    pub email: RecordingDirect,
    pub messaging: RecordingDirect,
    pub closed: Arc<AtomicBool>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            clock: ManualClock::new(start_time()),
            backend: MemoryBackend::new(),
            broadcast: RecordingBroadcast::default(),
            email: RecordingDirect::new("email"),
            messaging: RecordingDirect::new("whatsapp"),
            closed: Arc::default(),
        }
    }

    pub fn prober_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Monitor whose clock advances `step` per probe.
    pub async fn monitor(
        &self,
        settings: MonitorSettings,
        steps: impl IntoIterator<Item = Step>,
        step: chrono::Duration,
    ) -> Monitor {
        let prober = ScriptedProber {
            steps: steps.into_iter().collect(),
            clock: self.clock.clone(),
            step_duration: step,
            closed: self.closed.clone(),
        };
        self.monitor_with(settings, Box::new(prober)).await
    }

    /// Monitor around any prober, wired to the recording channels.
    pub async fn monitor_with(
        &self,
        settings: MonitorSettings,
        prober: Box<dyn Prober>,
    ) -> Monitor {
        let clock: Arc<dyn Clock> = Arc::new(self.clock.clone());
        let stats = StatsEngine::load(Box::new(self.backend.clone()), clock.clone()).await;
        let dispatcher = NotificationDispatcher::builder()
            .broadcast(
                self.broadcast.clone(),
                vec![String::from("100"), String::from("200")],
            )
            .email(self.email.clone())
            .messaging(self.messaging.clone())
            .send_timeout(Duration::from_secs(5))
            .build();

        Monitor::new(settings, prober, stats, dispatcher, clock)
    }
}

/// Run cycles until the script stops the monitor or `limit` is reached.
/// Returns the number of cycles run and whether the monitor stopped.
pub async fn run_cycles(monitor: &mut Monitor, limit: usize) -> (usize, bool) {
    for cycle in 1..=limit {
        if !monitor.run_cycle().await {
            return (cycle, true);
        }
    }
    (limit, false)
}
