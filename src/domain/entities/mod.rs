//! Domain entity definitions.

mod analysis;
mod api_key;
mod chat;
mod fingerprint;
mod image_buffer;

pub use analysis::{AnalysisOutcome, AnalysisResult, ResultSource};
pub use api_key::ApiKey;
pub use chat::{ChatHistory, ChatTurn};
pub use fingerprint::Fingerprint;
pub use image_buffer::{ImageBuffer, NORMALIZED_MIME_TYPE};
