//! Domain layer with core entities, errors, and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{
    AnalysisOutcome, AnalysisResult, ApiKey, ChatHistory, ChatTurn, Fingerprint, ImageBuffer,
    ResultSource,
};
pub use errors::{AnalysisError, ModelError, StoreError};
pub use ports::{ModelResponse, ResponseStorePort, VisionModelPort, VisionRequest};
