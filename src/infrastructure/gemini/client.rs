//! Gemini `generateContent` HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::dto::{ErrorResponse, GenerateContentRequest, GenerateContentResponse};
use crate::application::use_cases::{AnalysisClient, AnalysisConfig};
use crate::domain::entities::ApiKey;
use crate::domain::errors::{AnalysisError, ModelError};
use crate::domain::ports::{ModelResponse, VisionModelPort, VisionRequest};

/// Default Gemini REST endpoint.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default multimodal model.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const API_KEY_HEADER: &str = "x-goog-api-key";
const USER_AGENT: &str = concat!("clarity/", env!("CARGO_PKG_VERSION"));

/// Connection settings for [`GeminiClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Model identifier, e.g. `gemini-1.5-flash`.
    pub model: String,
    /// REST endpoint base, without the `/models` suffix.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Google Gemini vision client.
pub struct GeminiClient {
    client: Client,
    api_key: ApiKey,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Creates a client for the given credential.
    ///
    /// # Errors
    /// Returns `AnalysisError::Configuration` if the key is blank or not a
    /// valid header value, or the HTTP client cannot be built.
    pub fn new(api_key: &str, config: GeminiConfig) -> Result<Self, AnalysisError> {
        let api_key = ApiKey::new(api_key)?;

        if header::HeaderValue::from_str(api_key.as_str()).is_err() {
            return Err(AnalysisError::configuration(
                "API key contains characters not allowed in an HTTP header",
            ));
        }

        if config.model.trim().is_empty() {
            return Err(AnalysisError::configuration("model name must not be empty"));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| {
                AnalysisError::configuration(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    /// Connection settings in use.
    #[must_use]
    pub const fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn handle_error_response(status: StatusCode, response: reqwest::Response) -> ModelError {
        let retry_after_ms = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(|secs| secs.saturating_mul(1000));

        let error_message = match response.json::<ErrorResponse>().await {
            Ok(error) if !error.error.message.is_empty() => error.error.message,
            _ => format!("HTTP {status}"),
        };

        map_status(status, error_message, retry_after_ms)
    }
}

impl AnalysisClient {
    /// Creates a client backed by Gemini.
    ///
    /// # Errors
    /// Returns `AnalysisError::Configuration` for a blank credential or
    /// invalid settings, before any network use.
    pub fn gemini(
        api_key: &str,
        gemini: GeminiConfig,
        config: AnalysisConfig,
    ) -> Result<Self, AnalysisError> {
        let model = GeminiClient::new(api_key, gemini)?;
        Self::new(std::sync::Arc::new(model), config)
    }
}

/// Classifies a non-success HTTP status.
fn map_status(status: StatusCode, message: String, retry_after_ms: Option<u64>) -> ModelError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ModelError::RateLimited { retry_after_ms },
        StatusCode::REQUEST_TIMEOUT => ModelError::Timeout,
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => ModelError::ServiceUnavailable {
            status: status.as_u16(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ModelError::rejected(status.as_u16(), format!("credential refused: {message}"))
        }
        _ => ModelError::rejected(status.as_u16(), message),
    }
}

fn map_transport_error(e: &reqwest::Error) -> ModelError {
    if e.is_builder() || e.is_redirect() {
        ModelError::invalid_request(e.to_string())
    } else if e.is_timeout() {
        ModelError::Timeout
    } else if e.is_connect() {
        ModelError::network("failed to connect to the vision service")
    } else {
        ModelError::network(e.to_string())
    }
}

/// Extracts the answer and metadata from a response body.
fn parse_response(body: serde_json::Value) -> Result<ModelResponse, ModelError> {
    let parsed: GenerateContentResponse = serde_json::from_value(body.clone())
        .map_err(|e| ModelError::invalid_response(format!("failed to parse response: {e}")))?;

    if let Some(reason) = parsed.block_reason() {
        return Err(ModelError::blocked(reason));
    }

    let Some(text) = parsed.text() else {
        return Err(match parsed.finish_reason() {
            Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
                ModelError::blocked(reason)
            }
            _ => ModelError::invalid_response("response contained no answer text"),
        });
    };

    let raw = match body {
        serde_json::Value::Object(mut map) => {
            map.remove("candidates");
            (!map.is_empty()).then_some(serde_json::Value::Object(map))
        }
        _ => None,
    };

    Ok(ModelResponse { text, raw })
}

#[async_trait]
impl VisionModelPort for GeminiClient {
    async fn generate(&self, request: &VisionRequest) -> Result<ModelResponse, ModelError> {
        let body = GenerateContentRequest::from(request);

        debug!(
            model = %self.config.model,
            images = request.images.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to reach vision service");
                map_transport_error(&e)
            })?;

        let status = response.status();

        if !status.is_success() {
            return Err(Self::handle_error_response(status, response).await);
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to read generateContent response");
            if e.is_timeout() {
                ModelError::Timeout
            } else {
                ModelError::invalid_response(format!("failed to parse response: {e}"))
            }
        })?;

        parse_response(body)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
