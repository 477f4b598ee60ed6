//! Hourly summaries and retention

use chrono::{Duration, TimeZone, Utc};
use slotwatch::clock::truncate_to_hour;
use slotwatch::stats::{MemoryBackend, StatsStore};

use crate::helpers::*;

#[tokio::test]
async fn test_one_summary_per_hour_boundary() {
    let harness = Harness::new();
    // one probe a minute from 09:16 to 11:30
    let mut monitor = harness
        .monitor(settings(), [Step::Slots(1); 135], Duration::minutes(1))
        .await;

    run_cycles(&mut monitor, 135).await;

    let summaries: Vec<String> = harness
        .broadcast
        .texts()
        .into_iter()
        .filter(|text| text.starts_with("📊 Hourly summary"))
        .collect();

    assert_eq!(summaries.len(), 2);
    assert!(summaries[0].starts_with("📊 Hourly summary 09:00 (2025-08-02 09:00 - 2025-08-02 09:59)"));
    assert!(summaries[0].contains("🔍 Attempts: 44"));
    assert!(summaries[0].ends_with("🤖 Monitor running normally"));
    assert!(summaries[1].starts_with("📊 Hourly summary 10:00"));
    assert!(summaries[1].contains("🔍 Attempts: 60"));
    assert_eq!(
        monitor.state().last_hourly_report_hour,
        Utc.with_ymd_and_hms(2025, 8, 2, 11, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn test_fast_polling_reports_once() {
    let harness = Harness::new();
    // every 5s from 09:15 to 10:05
    let mut monitor = harness
        .monitor(settings(), [Step::Slots(0); 600], Duration::seconds(5))
        .await;

    run_cycles(&mut monitor, 600).await;

    assert_eq!(harness.broadcast.count_containing("Hourly summary"), 1);
}

#[tokio::test]
async fn test_no_summary_for_an_hour_without_data() {
    let harness = Harness::new();
    let mut monitor = harness
        .monitor(settings(), [Step::Slots(0)], Duration::hours(3))
        .await;

    monitor.run_cycle().await;

    assert_eq!(harness.broadcast.count_containing("Hourly summary"), 0);
    assert_eq!(
        monitor.state().last_hourly_report_hour,
        Utc.with_ymd_and_hms(2025, 8, 2, 12, 0, 0).unwrap()
    );

    monitor.run_cycle().await;
    assert_eq!(harness.broadcast.count_containing("Hourly summary"), 0);
}

#[tokio::test]
async fn test_hour_change_prunes_expired_buckets() {
    let old = start_time() - Duration::days(10);
    let recent = start_time() - Duration::days(2);
    let mut store = StatsStore::new(old);
    store.record(old, truncate_to_hour(old), 2, false);
    store.record(recent, truncate_to_hour(recent), 1, false);

    let mut harness = Harness::new();
    harness.backend = MemoryBackend::with_document(serde_json::to_string(&store).unwrap());
    let mut monitor = harness
        .monitor(settings(), [Step::Slots(0)], Duration::hours(1))
        .await;

    monitor.run_cycle().await;

    let hours: Vec<_> = monitor.stats().store().hourly_data.keys().copied().collect();
    assert_eq!(
        hours,
        vec![
            truncate_to_hour(recent),
            truncate_to_hour(start_time() + Duration::hours(1)),
        ]
    );
    // lifetime totals survive pruning
    assert_eq!(monitor.stats().store().total_attempts, 3);
}
