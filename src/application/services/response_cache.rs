//! In-memory LRU response cache.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::{AnalysisResult, Fingerprint};

/// Default maximum number of cached responses.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Bounded map from request fingerprint to analysis result.
///
/// Every operation takes the lock, so size and recency stay consistent under
/// concurrent use. The lock is never held across an await point.
pub struct ResponseCache {
    entries: Mutex<LruCache<Fingerprint, Arc<AnalysisResult>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    /// Creates a new cache with the specified capacity.
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a new cache with the default capacity.
    #[must_use]
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }

    /// Looks up a result and marks it most recently used.
    pub fn get(&self, key: &Fingerprint) -> Option<Arc<AnalysisResult>> {
        let mut entries = self.entries.lock();
        if let Some(result) = entries.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(fingerprint = %key.short(), "Response cache hit");
            Some(Arc::clone(result))
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(fingerprint = %key.short(), "Response cache miss");
            None
        }
    }

    /// Looks up a result without touching its recency.
    pub fn peek(&self, key: &Fingerprint) -> Option<Arc<AnalysisResult>> {
        self.entries.lock().peek(key).cloned()
    }

    /// Stores a result as most recently used, evicting the least recently
    /// used entry when full. An existing entry for the key is replaced.
    pub fn put(&self, key: Fingerprint, result: Arc<AnalysisResult>) {
        let mut entries = self.entries.lock();
        if let Some((evicted, _)) = entries.push(key, result)
            && evicted != key
        {
            debug!(fingerprint = %evicted.short(), "Evicted least recently used response");
        }
        trace!(fingerprint = %key.short(), size = entries.len(), "Stored response");
    }

    /// Returns true if the key is cached, without touching its recency.
    pub fn contains(&self, key: &Fingerprint) -> bool {
        self.entries.lock().contains(key)
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Removes every entry. Statistics are kept.
    pub fn clear(&self) {
        self.entries.lock().clear();
        debug!("Cleared response cache");
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: self.len(),
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached responses.
    pub size: usize,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cache: {} responses, {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.hit_rate, self.hits, self.misses
        )
    }
}
