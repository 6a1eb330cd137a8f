//! Image question answering with response caching and retries.
//!
//! Lookup order for single-image requests: Memory -> Disk (optional) -> Remote

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::services::{
    AnalysisMode, CacheStats, DEFAULT_CACHE_CAPACITY, ImagePreprocessor, PreprocessConfig,
    ResilientCaller, ResponseCache, RetryPolicy, analysis_prompt, comparison_prompt,
    parse_confidence,
};
use crate::domain::entities::{
    AnalysisOutcome, AnalysisResult, Fingerprint, ImageBuffer, ResultSource,
};
use crate::domain::errors::{AnalysisError, ModelError};
use crate::domain::ports::{ModelResponse, ResponseStorePort, VisionModelPort, VisionRequest};

/// Settings for [`AnalysisClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Image normalization settings.
    pub preprocess: PreprocessConfig,
    /// Maximum number of responses kept in memory.
    pub cache_capacity: usize,
    /// Retry policy for single-image requests.
    pub retry: RetryPolicy,
    /// Also apply the retry policy to comparisons.
    pub retry_comparisons: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            preprocess: PreprocessConfig::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            retry: RetryPolicy::default(),
            retry_comparisons: false,
        }
    }
}

/// Answers questions about images through a vision model.
pub struct AnalysisClient {
    model: Arc<dyn VisionModelPort>,
    preprocessor: ImagePreprocessor,
    cache: ResponseCache,
    store: Option<Arc<dyn ResponseStorePort>>,
    caller: ResilientCaller,
    comparison_caller: ResilientCaller,
}

impl std::fmt::Debug for AnalysisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisClient")
            .field("model", &self.model.model_name())
            .field("preprocessor", &self.preprocessor)
            .field("cache", &self.cache)
            .field("persistent", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

impl AnalysisClient {
    /// Creates a client around an injected model.
    ///
    /// # Errors
    /// Returns `AnalysisError::Configuration` if the image settings are invalid.
    pub fn new(
        model: Arc<dyn VisionModelPort>,
        config: AnalysisConfig,
    ) -> Result<Self, AnalysisError> {
        let preprocessor = ImagePreprocessor::new(config.preprocess)?;
        let caller = ResilientCaller::new(config.retry);
        let comparison_caller = if config.retry_comparisons {
            caller.clone()
        } else {
            ResilientCaller::new(RetryPolicy::single_attempt())
        };

        info!(
            model = model.model_name(),
            cache_capacity = config.cache_capacity,
            max_attempts = config.retry.max_attempts,
            "Analysis client initialized"
        );

        Ok(Self {
            model,
            preprocessor,
            cache: ResponseCache::new(config.cache_capacity),
            store: None,
            caller,
            comparison_caller,
        })
    }

    /// Adds a persistent response store behind the memory cache.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ResponseStorePort>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replaces the transient-failure classifier used for retries.
    #[must_use]
    pub fn with_retry_classifier(
        mut self,
        classifier: impl Fn(&ModelError) -> bool + Send + Sync + Clone + 'static,
    ) -> Self {
        self.caller = self.caller.with_classifier(classifier.clone());
        self.comparison_caller = self.comparison_caller.with_classifier(classifier);
        self
    }

    /// Answers `question` about one image.
    ///
    /// # Errors
    /// Returns `InvalidImage` for undecodable input and `RemoteCallFailed`
    /// once retries are exhausted.
    pub async fn analyze(
        &self,
        raw_image: impl Into<Bytes>,
        question: &str,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        self.analyze_with_cancel(
            raw_image,
            question,
            AnalysisMode::General,
            &CancellationToken::new(),
        )
        .await
    }

    /// Answers `question` about one image with a mode-specific emphasis.
    ///
    /// # Errors
    /// See [`Self::analyze`].
    pub async fn analyze_in_mode(
        &self,
        raw_image: impl Into<Bytes>,
        question: &str,
        mode: AnalysisMode,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        self.analyze_with_cancel(raw_image, question, mode, &CancellationToken::new())
            .await
    }

    /// Cancellable form of [`Self::analyze_in_mode`].
    ///
    /// # Errors
    /// See [`Self::analyze`]; additionally `Cancelled` once `cancel` fires.
    pub async fn analyze_with_cancel(
        &self,
        raw_image: impl Into<Bytes>,
        question: &str,
        mode: AnalysisMode,
        cancel: &CancellationToken,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let started = Instant::now();

        let image = self.normalize(raw_image.into()).await?;
        let prompt = analysis_prompt(question, mode);
        let fingerprint = Fingerprint::compute(&image, &prompt);
        debug!(fingerprint = %fingerprint.short(), %mode, "Computed request fingerprint");

        if let Some(result) = self.cache.get(&fingerprint) {
            debug!(fingerprint = %fingerprint.short(), "Serving analysis from memory cache");
            return Ok(outcome(result, Some(fingerprint), ResultSource::MemoryCache, started));
        }

        if let Some(result) = self.load_persisted(&fingerprint).await {
            self.cache.put(fingerprint, Arc::clone(&result));
            return Ok(outcome(result, Some(fingerprint), ResultSource::DiskCache, started));
        }

        info!(
            fingerprint = %fingerprint.short(),
            model = self.model.model_name(),
            "Making API call for question"
        );

        let request = VisionRequest::single(image, prompt);
        let response = self.invoke(&self.caller, &request, cancel).await?;
        let result = Arc::new(into_result(response));

        self.cache.put(fingerprint, Arc::clone(&result));
        self.persist(&fingerprint, &result).await;

        Ok(outcome(result, Some(fingerprint), ResultSource::Remote, started))
    }

    /// Answers `question` about two images. Never cached.
    ///
    /// # Errors
    /// Returns `InvalidImage` if either image is undecodable and
    /// `RemoteCallFailed` if the model call fails.
    pub async fn compare(
        &self,
        raw_image1: impl Into<Bytes>,
        raw_image2: impl Into<Bytes>,
        question: &str,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        self.compare_with_cancel(raw_image1, raw_image2, question, &CancellationToken::new())
            .await
    }

    /// Cancellable form of [`Self::compare`].
    ///
    /// # Errors
    /// See [`Self::compare`]; additionally `Cancelled` once `cancel` fires.
    pub async fn compare_with_cancel(
        &self,
        raw_image1: impl Into<Bytes>,
        raw_image2: impl Into<Bytes>,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let started = Instant::now();

        let (first, second) = tokio::try_join!(
            self.normalize(raw_image1.into()),
            self.normalize(raw_image2.into())
        )?;

        info!(model = self.model.model_name(), "Comparing images");

        let request = VisionRequest::pair(first, second, comparison_prompt(question));
        let response = self
            .invoke(&self.comparison_caller, &request, cancel)
            .await?;

        Ok(outcome(
            Arc::new(into_result(response)),
            None,
            ResultSource::Remote,
            started,
        ))
    }

    /// Returns memory cache statistics.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drops every in-memory response.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Name of the underlying model.
    #[must_use]
    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    async fn normalize(&self, raw: Bytes) -> Result<ImageBuffer, AnalysisError> {
        let preprocessor = self.preprocessor;
        tokio::task::spawn_blocking(move || preprocessor.normalize(&raw))
            .await
            .map_err(|e| AnalysisError::invalid_image(format!("preprocessing task failed: {e}")))?
    }

    async fn invoke(
        &self,
        caller: &ResilientCaller,
        request: &VisionRequest,
        cancel: &CancellationToken,
    ) -> Result<ModelResponse, AnalysisError> {
        let model = &self.model;
        caller
            .call_with_cancel(cancel, move || model.generate(request))
            .await
            .inspect_err(|e| warn!(error = %e, "Error analyzing image"))
    }

    async fn load_persisted(&self, fingerprint: &Fingerprint) -> Option<Arc<AnalysisResult>> {
        let store = self.store.as_ref()?;
        let result = store.load(fingerprint).await?;
        debug!(fingerprint = %fingerprint.short(), "Serving analysis from disk cache");
        Some(Arc::new(result))
    }

    async fn persist(&self, fingerprint: &Fingerprint, result: &AnalysisResult) {
        if let Some(store) = &self.store
            && let Err(e) = store.store(fingerprint, result).await
        {
            warn!(fingerprint = %fingerprint.short(), error = %e, "Failed to persist response");
        }
    }
}

fn into_result(response: ModelResponse) -> AnalysisResult {
    let confidence = parse_confidence(&response.text);
    AnalysisResult::new(response.text)
        .with_confidence(confidence)
        .with_raw(response.raw)
}

fn outcome(
    result: Arc<AnalysisResult>,
    fingerprint: Option<Fingerprint>,
    source: ResultSource,
    started: Instant,
) -> AnalysisOutcome {
    AnalysisOutcome {
        result,
        fingerprint,
        source,
        elapsed: started.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use mockall::predicate::always;

    use crate::domain::errors::StoreError;
    use crate::domain::ports::MockResponseStorePort;
    use crate::domain::ports::mocks::MockVisionModel;

    fn png(color: [u8; 3]) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 24, Rgb(color)));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn fast_config() -> AnalysisConfig {
        AnalysisConfig {
            retry: RetryPolicy::default()
                .with_delays(Duration::from_millis(1), Duration::from_millis(2)),
            ..AnalysisConfig::default()
        }
    }

    fn client(model: &Arc<MockVisionModel>) -> AnalysisClient {
        AnalysisClient::new(Arc::clone(model) as Arc<dyn VisionModelPort>, fast_config()).unwrap()
    }

    #[tokio::test]
    async fn test_identical_requests_call_remote_once() {
        let model = Arc::new(MockVisionModel::answering(
            "1. Direct Answer: A red square\n3. Confidence: High",
        ));
        let client = client(&model);
        let image = png([255, 0, 0]);

        let first = client.analyze(image.clone(), "What is this?").await.unwrap();
        let second = client.analyze(image, "What is this?").await.unwrap();

        assert_eq!(model.calls(), 1);
        assert_eq!(first.source, ResultSource::Remote);
        assert_eq!(second.source, ResultSource::MemoryCache);
        assert_eq!(first.fingerprint, second.fingerprint);
        assert!(Arc::ptr_eq(&first.result, &second.result));
        assert_eq!(second.confidence(), Some(0.9));
    }

    #[tokio::test]
    async fn test_different_questions_are_cached_separately() {
        let model = Arc::new(MockVisionModel::answering("answer"));
        let client = client(&model);
        let image = png([0, 255, 0]);

        let a = client.analyze(image.clone(), "What color?").await.unwrap();
        let b = client.analyze(image, "What shape?").await.unwrap();

        assert_eq!(model.calls(), 2);
        assert_ne!(a.fingerprint, b.fingerprint);
        assert_eq!(client.cache_stats().size, 2);
    }

    #[tokio::test]
    async fn test_mode_is_part_of_fingerprint() {
        let model = Arc::new(MockVisionModel::answering("answer"));
        let client = client(&model);
        let image = png([0, 0, 255]);

        client.analyze(image.clone(), "q").await.unwrap();
        client
            .analyze_in_mode(image, "q", AnalysisMode::Artistic)
            .await
            .unwrap();

        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_request_carries_normalized_image_and_prompt() {
        let model = Arc::new(MockVisionModel::answering("answer"));
        let client = client(&model);

        client.analyze(png([9, 9, 9]), "How many?").await.unwrap();

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].images.len(), 1);
        assert_eq!(requests[0].images[0].mime_type(), "image/jpeg");
        assert!(requests[0].prompt.contains("How many?"));
        assert!(requests[0].prompt.contains("Direct Answer"));
    }

    #[tokio::test]
    async fn test_invalid_image_makes_no_remote_call() {
        let model = Arc::new(MockVisionModel::answering("answer"));
        let client = client(&model);

        let result = client.analyze(b"garbage".to_vec(), "q").await;

        assert!(matches!(result, Err(AnalysisError::InvalidImage { .. })));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let model = Arc::new(MockVisionModel::answering("recovered").with_script([
            Err(ModelError::Timeout),
            Err(ModelError::ServiceUnavailable { status: 503 }),
        ]));
        let client = client(&model);

        let outcome = client.analyze(png([1, 2, 3]), "q").await.unwrap();

        assert_eq!(outcome.answer(), "recovered");
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_not_cached() {
        let model = Arc::new(MockVisionModel::answering("late").with_script([
            Err(ModelError::Timeout),
            Err(ModelError::Timeout),
            Err(ModelError::Timeout),
        ]));
        let client = client(&model);
        let image = png([4, 5, 6]);

        let failed = client.analyze(image.clone(), "q").await;
        assert!(matches!(
            failed,
            Err(AnalysisError::RemoteCallFailed { attempts: 3, .. })
        ));
        assert_eq!(client.cache_stats().size, 0);

        let retried = client.analyze(image, "q").await.unwrap();
        assert_eq!(retried.answer(), "late");
        assert_eq!(model.calls(), 4);
    }

    #[tokio::test]
    async fn test_compare_bypasses_cache_and_sends_both_images() {
        let model = Arc::new(MockVisionModel::answering("4. Answer: the left one"));
        let client = client(&model);

        let first = client
            .compare(png([255, 0, 0]), png([0, 0, 255]), "Which is red?")
            .await
            .unwrap();
        let second = client
            .compare(png([255, 0, 0]), png([0, 0, 255]), "Which is red?")
            .await
            .unwrap();

        assert_eq!(model.calls(), 2);
        assert_eq!(first.fingerprint, None);
        assert_eq!(second.source, ResultSource::Remote);
        assert_eq!(client.cache_stats().size, 0);

        let request = &model.requests()[0];
        assert_eq!(request.images.len(), 2);
        assert!(request.prompt.contains("4. Answer:"));
    }

    #[tokio::test]
    async fn test_compare_single_attempt_by_default() {
        let model = Arc::new(
            MockVisionModel::answering("ok").with_script([Err(ModelError::Timeout)]),
        );
        let client = client(&model);

        let result = client.compare(png([1, 1, 1]), png([2, 2, 2]), "q").await;

        assert!(matches!(
            result,
            Err(AnalysisError::RemoteCallFailed { attempts: 1, .. })
        ));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_compare_retries_when_enabled() {
        let model = Arc::new(
            MockVisionModel::answering("ok").with_script([Err(ModelError::Timeout)]),
        );
        let config = AnalysisConfig {
            retry_comparisons: true,
            ..fast_config()
        };
        let client =
            AnalysisClient::new(Arc::clone(&model) as Arc<dyn VisionModelPort>, config).unwrap();

        let outcome = client
            .compare(png([1, 1, 1]), png([2, 2, 2]), "q")
            .await
            .unwrap();

        assert_eq!(outcome.answer(), "ok");
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_compare_rejects_invalid_second_image() {
        let model = Arc::new(MockVisionModel::answering("ok"));
        let client = client(&model);

        let result = client.compare(png([1, 1, 1]), b"nope".to_vec(), "q").await;

        assert!(matches!(result, Err(AnalysisError::InvalidImage { .. })));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_store_hit_skips_remote_call() {
        let model = Arc::new(MockVisionModel::answering("remote"));
        let mut store = MockResponseStorePort::new();
        store
            .expect_load()
            .with(always())
            .times(1)
            .returning(|_| Some(AnalysisResult::new("persisted")));
        store.expect_store().never();

        let client = client(&model).with_store(Arc::new(store));
        let image = png([7, 7, 7]);

        let first = client.analyze(image.clone(), "q").await.unwrap();
        let second = client.analyze(image, "q").await.unwrap();

        assert_eq!(first.answer(), "persisted");
        assert_eq!(first.source, ResultSource::DiskCache);
        assert_eq!(second.source, ResultSource::MemoryCache);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_does_not_fail_request() {
        let model = Arc::new(MockVisionModel::answering("remote"));
        let mut store = MockResponseStorePort::new();
        store.expect_load().returning(|_| None);
        store
            .expect_store()
            .times(1)
            .returning(|_, _| Err(StoreError::CacheDirNotFound));

        let client = client(&model).with_store(Arc::new(store));

        let outcome = client.analyze(png([8, 8, 8]), "q").await.unwrap();

        assert_eq!(outcome.answer(), "remote");
        assert_eq!(outcome.source, ResultSource::Remote);
    }

    #[tokio::test]
    async fn test_cancelled_request_returns_cancelled() {
        let model = Arc::new(MockVisionModel::answering("ok"));
        let client = client(&model);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = client
            .analyze_with_cancel(png([3, 3, 3]), "q", AnalysisMode::General, &cancel)
            .await;

        assert!(matches!(result, Err(AnalysisError::Cancelled)));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_preprocess_config_is_configuration_error() {
        let model = Arc::new(MockVisionModel::answering("ok"));
        let config = AnalysisConfig {
            preprocess: PreprocessConfig {
                max_dimension: 0,
                jpeg_quality: 85,
            },
            ..AnalysisConfig::default()
        };

        let result = AnalysisClient::new(model as Arc<dyn VisionModelPort>, config);

        assert!(matches!(result, Err(AnalysisError::Configuration { .. })));
    }
}
