use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::domain::ports::VisionRequest;

/// `generateContent` request body.
#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    /// Conversation turns; a single user turn here.
    pub contents: Vec<Content>,
}

impl From<&VisionRequest> for GenerateContentRequest {
    fn from(request: &VisionRequest) -> Self {
        let mut parts: Vec<Part> = request
            .images
            .iter()
            .map(|image| Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type().to_string(),
                    data: BASE64.encode(image.as_bytes()),
                },
            })
            .collect();
        parts.push(Part::Text {
            text: request.prompt.clone(),
        });

        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
        }
    }
}

/// One turn of a conversation.
#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    /// `user` or `model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Ordered content parts.
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
#[allow(missing_docs)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
    /// Any part kind this client does not use.
    Other(serde_json::Value),
}

/// Embedded binary payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct InlineData {
    /// MIME type of `data`.
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

/// `generateContent` response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Generated candidates, usually one.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Present when the prompt itself was filtered.
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let content = candidate.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }

    /// Reason the prompt was blocked, if any.
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
    }

    /// Finish reason of the first candidate.
    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.as_deref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One generated answer.
pub struct Candidate {
    /// Answer content, absent when generation was stopped early.
    pub content: Option<Content>,
    /// Why generation stopped, e.g. `STOP` or `SAFETY`.
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Prompt-level safety feedback.
pub struct PromptFeedback {
    /// Set when the prompt was blocked.
    pub block_reason: Option<String>,
}

/// Google API error envelope.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    /// Error details.
    pub error: ErrorBody,
}

/// Error details.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Canonical status, e.g. `INVALID_ARGUMENT`.
    #[serde(default)]
    pub status: Option<String>,
}
