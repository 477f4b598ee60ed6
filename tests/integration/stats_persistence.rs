//! File-backed stats across restarts

use std::sync::Arc;

use chrono::Duration;
use pretty_assertions::assert_eq;
use slotwatch::clock::ManualClock;
use slotwatch::stats::{JsonFileBackend, StatsEngine, StatsStore};
use tempfile::tempdir;

use crate::helpers::start_time;

async fn engine(path: &std::path::Path, clock: &ManualClock) -> StatsEngine {
    StatsEngine::load(
        Box::new(JsonFileBackend::new(path)),
        Arc::new(clock.clone()),
    )
    .await
}

#[tokio::test]
async fn test_store_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state").join("bot_stats.json");
    let clock = ManualClock::new(start_time());

    let mut stats = engine(&path, &clock).await;
    for (i, slots) in [0, 0, 2, 0, -1, 5, 0, 0, 1, 0].into_iter().enumerate() {
        clock.advance(Duration::minutes(10));
        stats.record_attempt(slots, slots < 0).await;
        if i == 5 {
            clock.advance(Duration::hours(1));
        }
    }
    let before = stats.store().clone();
    drop(stats);

    let reloaded = engine(&path, &clock).await;
    assert_eq!(reloaded.store(), &before);
    assert_eq!(reloaded.store().total_slots_checked, 8);
    assert_eq!(reloaded.store().total_errors, 1);

    let bucket_attempts: u64 = reloaded
        .store()
        .hourly_data
        .values()
        .map(|bucket| bucket.attempts)
        .sum();
    assert_eq!(bucket_attempts, 10);
}

#[tokio::test]
async fn test_document_is_keyed_by_iso_hour() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bot_stats.json");
    let clock = ManualClock::new(start_time());

    let mut stats = engine(&path, &clock).await;
    stats.record_attempt(3, false).await;

    let raw = std::fs::read_to_string(&path).unwrap();
    let document: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let bucket = &document["hourly_data"]["2025-08-02T09:00:00Z"];

    assert_eq!(bucket["attempts"], 1);
    assert_eq!(bucket["min_slots"], 3);
    assert_eq!(document["total_attempts"], 1);
    assert!(!dir.path().join("bot_stats.json.tmp").exists());
}

#[tokio::test]
async fn test_corrupt_file_starts_fresh_and_is_replaced() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bot_stats.json");
    std::fs::write(&path, "{ \"total_attempts\": ").unwrap();
    let clock = ManualClock::new(start_time());

    let mut stats = engine(&path, &clock).await;
    assert_eq!(stats.store(), &StatsStore::new(start_time()));

    stats.record_attempt(0, false).await;
    let reloaded = engine(&path, &clock).await;
    assert_eq!(reloaded.store().total_attempts, 1);
}
