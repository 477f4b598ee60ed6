//! Stats backend trait definition

use async_trait::async_trait;

use super::error::StatsResult;
use super::schema::StatsStore;

/// Durable home of the [`StatsStore`].
///
/// The engine loads once at startup and saves the whole store after every
/// mutation, so `save` must leave either the previous or the new document
/// in place, never a torn one.
#[async_trait]
pub trait StatsBackend: Send + Sync {
    /// Load the stored document
    ///
    /// `Ok(None)` means nothing was stored yet. An `Err` means something was
    /// stored but could not be read back.
    async fn load(&self) -> StatsResult<Option<StatsStore>>;

    /// Replace the stored document
    async fn save(&self, store: &StatsStore) -> StatsResult<()>;

    /// Human-readable location, used in logs
    fn describe(&self) -> String;
}
