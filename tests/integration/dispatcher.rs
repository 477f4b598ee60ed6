//! Delivery accounting across recipients and channels

use std::time::Duration;

use chrono::Utc;
use slotwatch::Outcome;
use slotwatch::alerts::{Alert, CriticalReason};
use slotwatch::notify::{DeliveryReport, NotificationDispatcher};
use slotwatch::stats::{SessionTotals, StatsSnapshot};

use crate::helpers::*;

fn recipients() -> Vec<String> {
    vec![String::from("1"), String::from("2"), String::from("3")]
}

fn outcome(slots: i64) -> Outcome {
    Outcome::new(slots, Utc::now(), TARGET_DATE, "scripted")
}

#[tokio::test]
async fn test_partial_broadcast_failure_is_a_success() {
    let broadcast = RecordingBroadcast::failing(&["2"]);
    let dispatcher = NotificationDispatcher::builder()
        .broadcast(broadcast.clone(), recipients())
        .build();

    assert_eq!(
        dispatcher.broadcast("hello").await,
        DeliveryReport {
            delivered: 2,
            attempted: 3
        }
    );
    assert!(dispatcher.send_hourly_summary("📊 summary").await);

    let sent = broadcast.sent.lock().unwrap();
    let recipients: Vec<&str> = sent.iter().map(|(r, _)| r.as_str()).collect();
    assert_eq!(recipients, vec!["1", "3", "1", "3"]);
}

#[tokio::test]
async fn test_one_working_channel_is_enough() {
    let messaging = RecordingDirect::new("whatsapp");
    let dispatcher = NotificationDispatcher::builder()
        .broadcast(RecordingBroadcast::failing(&["1", "2", "3"]), recipients())
        .email(RecordingDirect::broken("email"))
        .messaging(messaging.clone())
        .build();

    assert!(dispatcher.send_availability_alert(&outcome(4)).await);
    assert_eq!(
        messaging.subjects(),
        vec!["🎉 SLOTS AVAILABLE - 02/08/2025 (4)"]
    );
}

#[tokio::test]
async fn test_all_channels_failing_reports_failure() {
    let dispatcher = NotificationDispatcher::builder()
        .broadcast(RecordingBroadcast::failing(&["1", "2", "3"]), recipients())
        .email(RecordingDirect::broken("email"))
        .messaging(RecordingDirect::broken("whatsapp"))
        .build();

    assert!(!dispatcher.send_availability_alert(&outcome(1)).await);
}

#[tokio::test]
async fn test_critical_alert_skips_messaging() {
    let email = RecordingDirect::new("email");
    let messaging = RecordingDirect::new("whatsapp");
    let dispatcher = NotificationDispatcher::builder()
        .broadcast(RecordingBroadcast::default(), recipients())
        .email(email.clone())
        .messaging(messaging.clone())
        .send_timeout(Duration::from_secs(1))
        .build();

    let now = Utc::now();
    let alert = Alert::Critical {
        reason: CriticalReason::TooManyErrors {
            consecutive_errors: 5,
            max_errors: 5,
        },
        stats: StatsSnapshot {
            taken_at: now,
            start_date: now,
            total_attempts: 5,
            total_slots_checked: 0,
            max_slots_found: 0,
            availability_found_count: 0,
            total_errors: 5,
            session: SessionTotals::default(),
        },
    };

    assert!(dispatcher.send_critical_alert(&alert).await);
    assert_eq!(email.subjects(), vec!["🚨 CRITICAL - monitor stopped"]);
    assert!(messaging.subjects().is_empty());
}

#[tokio::test]
async fn test_test_message_reports_each_channel() {
    let dispatcher = NotificationDispatcher::builder()
        .broadcast(RecordingBroadcast::default(), recipients())
        .email(RecordingDirect::broken("email"))
        .build();

    let results = dispatcher.send_test_message("ping").await;
    assert_eq!(
        results,
        vec![(String::from("recording"), true), (String::from("email"), false)]
    );
    assert_eq!(dispatcher.channel_names(), vec!["recording", "email"]);
}
