//! Analysis results and their provenance.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Fingerprint;

/// Answer returned by the vision model for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Free-form answer text.
    pub answer: String,
    /// Confidence in `[0, 1]` extracted from the answer, if stated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Raw response metadata from the model provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl AnalysisResult {
    /// Creates a result with only an answer.
    #[must_use]
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            confidence: None,
            raw: None,
        }
    }

    /// Sets the confidence, clamped to `[0, 1]`. Non-finite values are dropped.
    #[must_use]
    pub fn with_confidence(mut self, confidence: Option<f32>) -> Self {
        self.confidence = confidence
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0));
        self
    }

    /// Attaches raw provider metadata.
    #[must_use]
    pub fn with_raw(mut self, raw: Option<serde_json::Value>) -> Self {
        self.raw = raw;
        self
    }
}

/// Where an analysis result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    /// In-memory response cache.
    MemoryCache,
    /// Persistent response store.
    DiskCache,
    /// Fresh call to the vision model.
    Remote,
}

impl ResultSource {
    /// Returns true for either cache tier.
    #[must_use]
    pub const fn is_cached(self) -> bool {
        matches!(self, Self::MemoryCache | Self::DiskCache)
    }
}

impl fmt::Display for ResultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MemoryCache => write!(f, "memory cache"),
            Self::DiskCache => write!(f, "disk cache"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// A result together with how it was obtained.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// The shared, read-only result.
    pub result: Arc<AnalysisResult>,
    /// Cache key of the request. Comparisons are not fingerprinted.
    pub fingerprint: Option<Fingerprint>,
    /// Which tier produced the result.
    pub source: ResultSource,
    /// Wall time spent serving the request.
    pub elapsed: Duration,
}

impl AnalysisOutcome {
    /// Returns the answer text.
    #[must_use]
    pub fn answer(&self) -> &str {
        &self.result.answer
    }

    /// Returns the parsed confidence.
    #[must_use]
    pub fn confidence(&self) -> Option<f32> {
        self.result.confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        let result = AnalysisResult::new("ok").with_confidence(Some(1.7));
        assert_eq!(result.confidence, Some(1.0));

        let result = AnalysisResult::new("ok").with_confidence(Some(f32::NAN));
        assert_eq!(result.confidence, None);
    }

    #[test]
    fn test_serialization_skips_missing_fields() {
        let json = serde_json::to_string(&AnalysisResult::new("a cat")).unwrap();
        assert_eq!(json, r#"{"answer":"a cat"}"#);
    }

    #[test]
    fn test_source_is_cached() {
        assert!(ResultSource::MemoryCache.is_cached());
        assert!(ResultSource::DiskCache.is_cached());
        assert!(!ResultSource::Remote.is_cached());
    }
}
