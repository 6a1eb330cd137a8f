//! Application services: image normalization, caching, retries, prompts.

pub mod confidence_parser;
pub mod image_preprocessor;
pub mod prompt_builder;
pub mod resilient_caller;
pub mod response_cache;

pub use confidence_parser::parse_confidence;
pub use image_preprocessor::{
    DEFAULT_JPEG_QUALITY, DEFAULT_MAX_DIMENSION, ImagePreprocessor, PreprocessConfig,
};
pub use prompt_builder::{
    AnalysisMode, COMPARISON_PROMPTS, QUICK_PROMPTS, analysis_prompt, combine_questions,
    comparison_prompt, find_preset,
};
pub use resilient_caller::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY, DEFAULT_MIN_DELAY, ResilientCaller, RetryPolicy,
};
pub use response_cache::{CacheStats, DEFAULT_CACHE_CAPACITY, ResponseCache};
