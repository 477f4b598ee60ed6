//! In-memory stats backend (no persistence)
//!
//! Keeps the serialized document in memory so a "restart" can be simulated
//! by building a second engine on a clone of the same backend. Writes can be
//! made to fail on demand.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use super::backend::StatsBackend;
use super::error::{StatsError, StatsResult};
use super::schema::StatsStore;

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    document: Arc<Mutex<Option<String>>>,
    fail_writes: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-seeded with a raw document, valid or not.
    pub fn with_document(document: impl ToString) -> Self {
        let backend = Self::new();
        *backend.lock() = Some(document.to_string());
        backend
    }

    pub fn document(&self) -> Option<String> {
        self.lock().clone()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl StatsBackend for MemoryBackend {
    async fn load(&self) -> StatsResult<Option<StatsStore>> {
        match self.document() {
            Some(document) => Ok(Some(serde_json::from_str(&document)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, store: &StatsStore) -> StatsResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            debug!("in-memory backend: rejecting write");
            return Err(StatsError::BackendError(String::from(
                "writes disabled",
            )));
        }

        let document = serde_json::to_string(store)?;
        *self.lock() = Some(document);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        String::from("in-memory")
    }
}
