//! Port definition for persistent response storage.

use async_trait::async_trait;

use crate::domain::entities::{AnalysisResult, Fingerprint};
use crate::domain::errors::StoreResult;

/// Durable extension of the in-memory response cache.
/// Keyed by the same fingerprints; never required for correctness.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResponseStorePort: Send + Sync {
    /// Persists a result.
    async fn store(&self, key: &Fingerprint, result: &AnalysisResult) -> StoreResult<()>;

    /// Loads a result, or `None` if absent or unreadable.
    async fn load(&self, key: &Fingerprint) -> Option<AnalysisResult>;
}
