//! Use case implementations.

mod analysis_client;

pub use analysis_client::{AnalysisClient, AnalysisConfig};
