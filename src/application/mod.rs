//! Application layer with the analysis pipeline and its services.

/// Preprocessing, caching, retry, and prompt services.
pub mod services;
/// Use case implementations.
pub mod use_cases;

pub use services::{
    AnalysisMode, CacheStats, ImagePreprocessor, ResilientCaller, ResponseCache, RetryPolicy,
};
pub use use_cases::{AnalysisClient, AnalysisConfig};
