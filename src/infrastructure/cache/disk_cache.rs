//! Disk-based response cache for persistence across sessions.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

use crate::domain::entities::{AnalysisResult, Fingerprint};
use crate::domain::errors::{StoreError, StoreResult};
use crate::domain::ports::ResponseStorePort;

/// Maximum disk cache size in bytes (20 MB default).
pub const DEFAULT_MAX_DISK_BYTES: u64 = 20 * 1024 * 1024;

const ENTRY_EXTENSION: &str = "json";
const PARTIAL_EXTENSION: &str = "partial";

/// On-disk envelope around a cached result.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    fingerprint: String,
    stored_at: DateTime<Utc>,
    result: AnalysisResult,
}

/// Disk-based cache that persists analysis results as JSON files named by
/// fingerprint.
pub struct DiskResponseCache {
    cache_dir: PathBuf,
    max_size: u64,
    current_size: AtomicU64,
    item_count: AtomicUsize,
    write_seq: AtomicU64,
}

impl DiskResponseCache {
    /// Opens (or creates) a cache in the specified directory.
    ///
    /// # Errors
    /// Returns error if the cache directory cannot be created or read.
    pub async fn new(cache_dir: PathBuf, max_size: u64) -> StoreResult<Self> {
        fs::create_dir_all(&cache_dir).await?;

        let mut total_size = 0u64;
        let mut count = 0usize;
        let mut entries = fs::read_dir(&cache_dir).await?;

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if is_entry(&path) {
                if let Ok(meta) = entry.metadata().await {
                    total_size += meta.len();
                    count += 1;
                }
            } else if path
                .extension()
                .is_some_and(|ext| ext == PARTIAL_EXTENSION)
            {
                let _ = fs::remove_file(&path).await;
            }
        }

        debug!(
            path = %cache_dir.display(),
            entries = count,
            size = total_size,
            "Opened disk response cache"
        );

        let cache = Self {
            cache_dir,
            max_size,
            current_size: AtomicU64::new(total_size),
            item_count: AtomicUsize::new(count),
            write_seq: AtomicU64::new(0),
        };

        cache.cleanup_if_needed().await;

        Ok(cache)
    }

    /// Opens a cache in the default location (`~/.cache/clarity/responses/`).
    ///
    /// # Errors
    /// Returns error if the cache directory cannot be created.
    pub async fn default_location(max_size: u64) -> StoreResult<Self> {
        let cache_dir = default_cache_dir().ok_or(StoreError::CacheDirNotFound)?;
        Self::new(cache_dir, max_size).await
    }

    /// Directory holding the cache files.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn cache_path(&self, key: &Fingerprint) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{ENTRY_EXTENSION}", key.to_hex()))
    }

    /// Scratch file for one write; unique per process and call.
    fn partial_path(&self, key: &Fingerprint) -> PathBuf {
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        self.cache_dir.join(format!(
            "{}.{}-{seq}.{PARTIAL_EXTENSION}",
            key.to_hex(),
            std::process::id()
        ))
    }

    /// Removes one entry.
    pub async fn evict(&self, key: &Fingerprint) {
        let path = self.cache_path(key);
        let size = fs::metadata(&path).await.map(|m| m.len()).ok();
        if let Err(e) = fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(fingerprint = %key.short(), error = %e, "Failed to evict from disk cache");
            }
        } else if let Some(s) = size {
            self.release(s, 1);
            debug!(fingerprint = %key.short(), "Evicted from disk cache");
        }
    }

    /// Removes every cached entry.
    ///
    /// # Errors
    /// Returns error if the cache directory cannot be read.
    pub async fn clear(&self) -> StoreResult<()> {
        let mut entries = fs::read_dir(&self.cache_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_entry(&path) && fs::remove_file(&path).await.is_err() {
                warn!(path = %path.display(), "Failed to remove cache file");
            }
        }
        self.current_size.store(0, Ordering::Relaxed);
        self.item_count.store(0, Ordering::Relaxed);
        debug!("Cleared disk response cache");
        Ok(())
    }

    /// Returns the current cache size in bytes.
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size.load(Ordering::Relaxed)
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.item_count.load(Ordering::Relaxed)
    }

    /// Returns true if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks if a fingerprint is cached.
    pub async fn contains(&self, key: &Fingerprint) -> bool {
        fs::try_exists(self.cache_path(key)).await.unwrap_or(false)
    }

    /// Subtracts removed files from the counters. Files written by another
    /// process were never counted, so the counters saturate at zero.
    fn release(&self, size: u64, count: usize) {
        let _ = self
            .current_size
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(size))
            });
        let _ = self
            .item_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(count))
            });
    }

    /// Deletes the least recently used files once the size budget is exceeded.
    async fn cleanup_if_needed(&self) {
        let current_size = self.current_size();
        if current_size <= self.max_size {
            return;
        }

        debug!(
            current_size = current_size,
            max_size = self.max_size,
            "Disk cache over limit, cleaning up"
        );

        let Ok(mut entries) = fs::read_dir(&self.cache_dir).await else {
            return;
        };

        let mut files: Vec<(PathBuf, SystemTime, u64)> = Vec::new();

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if !is_entry(&path) {
                continue;
            }

            if let Ok(meta) = entry.metadata().await {
                let used = meta
                    .accessed()
                    .or_else(|_| meta.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                files.push((path, used, meta.len()));
            }
        }

        files.sort_by_key(|(_, time, _)| *time);

        let mut freed_size = 0u64;
        let mut freed_count = 0usize;
        let target = current_size - self.max_size + (self.max_size / 10);

        for (path, _, size) in files {
            if freed_size >= target {
                break;
            }

            if let Err(e) = fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove old cache file");
            } else {
                trace!(path = %path.display(), "Removed old cache file");
                freed_size += size;
                freed_count += 1;
            }
        }
        self.release(freed_size, freed_count);

        debug!(
            freed_size = freed_size,
            freed_count = freed_count,
            "Disk cache cleanup complete"
        );
    }
}

#[async_trait]
impl ResponseStorePort for DiskResponseCache {
    async fn store(&self, key: &Fingerprint, result: &AnalysisResult) -> StoreResult<()> {
        let path = self.cache_path(key);
        let partial = self.partial_path(key);

        let entry = CacheEntry {
            fingerprint: key.to_hex(),
            stored_at: Utc::now(),
            result: result.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&entry)?;

        let old_size = fs::metadata(&path).await.map(|m| m.len()).ok();

        if let Err(e) = write_atomically(&partial, &path, &bytes).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e.into());
        }

        let new_size = bytes.len() as u64;
        if let Some(old) = old_size {
            if new_size > old {
                self.current_size
                    .fetch_add(new_size - old, Ordering::Relaxed);
            } else {
                self.release(old - new_size, 0);
            }
        } else {
            self.current_size.fetch_add(new_size, Ordering::Relaxed);
            self.item_count.fetch_add(1, Ordering::Relaxed);
        }

        debug!(fingerprint = %key.short(), size = new_size, "Stored response in disk cache");

        self.cleanup_if_needed().await;

        Ok(())
    }

    async fn load(&self, key: &Fingerprint) -> Option<AnalysisResult> {
        let path = self.cache_path(key);
        let Ok(bytes) = fs::read(&path).await else {
            trace!(fingerprint = %key.short(), "Disk cache miss");
            return None;
        };

        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) if entry.fingerprint == key.to_hex() => {
                trace!(fingerprint = %key.short(), stored_at = %entry.stored_at, "Disk cache hit");
                Some(entry.result)
            }
            Ok(_) => {
                warn!(fingerprint = %key.short(), "Disk cache entry has mismatched key, discarding");
                self.evict(key).await;
                None
            }
            Err(e) => {
                warn!(fingerprint = %key.short(), error = %e, "Corrupt disk cache entry, discarding");
                self.evict(key).await;
                None
            }
        }
    }
}

async fn write_atomically(partial: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(partial).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(partial, path).await
}

fn is_entry(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION)
}

/// Returns the default cache directory path.
#[must_use]
pub fn default_cache_dir() -> Option<PathBuf> {
    crate::infrastructure::config::project_dirs().map(|dirs| dirs.cache_dir().join("responses"))
}
