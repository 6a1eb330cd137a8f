//! Clarity - ask questions about images using a vision-language model.
//!
//! Images are normalized to bounded-size JPEG, paired with a structured
//! prompt, and sent to the model under a retry policy. Answers are cached
//! in memory by content fingerprint and optionally persisted to disk.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the analysis pipeline and its services.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;
/// Presentation layer containing terminal commands and rendering.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "clarity";
