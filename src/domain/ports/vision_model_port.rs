//! Port definition for the remote vision model.

use async_trait::async_trait;

use crate::domain::entities::ImageBuffer;
use crate::domain::errors::ModelError;

/// One multimodal request: images first, then the prompt.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    /// Normalized images, in the order the prompt refers to them.
    pub images: Vec<ImageBuffer>,
    /// Prompt text.
    pub prompt: String,
}

impl VisionRequest {
    /// Creates a single-image request.
    #[must_use]
    pub fn single(image: ImageBuffer, prompt: impl Into<String>) -> Self {
        Self {
            images: vec![image],
            prompt: prompt.into(),
        }
    }

    /// Creates a two-image request.
    #[must_use]
    pub fn pair(first: ImageBuffer, second: ImageBuffer, prompt: impl Into<String>) -> Self {
        Self {
            images: vec![first, second],
            prompt: prompt.into(),
        }
    }
}

/// Text produced by the model plus provider metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    /// Generated answer text.
    pub text: String,
    /// Provider response body, minus the echoed answer.
    pub raw: Option<serde_json::Value>,
}

impl ModelResponse {
    /// Creates a response without metadata.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            raw: None,
        }
    }
}

/// Port for vision-language model invocations.
/// Implementations must be thread-safe.
#[async_trait]
pub trait VisionModelPort: Send + Sync {
    /// Performs exactly one remote invocation.
    async fn generate(&self, request: &VisionRequest) -> Result<ModelResponse, ModelError>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}
