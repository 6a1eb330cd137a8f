//! Domain error types.

mod analysis_error;
mod store_error;

pub use analysis_error::{AnalysisError, ModelError};
pub use store_error::{StoreError, StoreResult};
