//! Interrupt handling of `Monitor::run`

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use slotwatch::Outcome;
use slotwatch::monitors::StopReason;
use slotwatch::probe::{ProbeResult, Prober};

use crate::helpers::*;

/// Sends SIGINT to the test process during its first check.
struct InterruptingProber {
    interrupted: bool,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Prober for InterruptingProber {
    fn method(&self) -> &str {
        "interrupting"
    }

    async fn check(&mut self) -> ProbeResult<Outcome> {
        if !self.interrupted {
            self.interrupted = true;
            let status = std::process::Command::new("kill")
                .args(["-INT", &std::process::id().to_string()])
                .status()
                .unwrap();
            assert!(status.success());
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        Ok(Outcome::new(0, Utc::now(), TARGET_DATE, "interrupting"))
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_interrupt_during_first_cycle_stops_gracefully() {
    let harness = Harness::new();
    let closed = Arc::new(AtomicBool::new(false));
    let prober = InterruptingProber {
        interrupted: false,
        closed: closed.clone(),
    };
    let mut monitor = harness.monitor_with(settings(), Box::new(prober)).await;

    let reason = monitor.run().await;

    assert_eq!(reason, StopReason::Cancelled);
    assert!(closed.load(Ordering::SeqCst));
    assert_eq!(monitor.stats().store().total_attempts, 1);

    let texts = harness.broadcast.texts();
    assert!(texts[0].starts_with("🤖 Monitor started"));
    assert!(texts.last().unwrap().starts_with("🛑 Monitor stopped"));
    assert!(harness.backend.document().is_some());
}
