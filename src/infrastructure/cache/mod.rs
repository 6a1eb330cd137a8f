//! Persistent response cache.

mod disk_cache;

pub use disk_cache::{DEFAULT_MAX_DISK_BYTES, DiskResponseCache, default_cache_dir};
