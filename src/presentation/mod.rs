//! Presentation layer: terminal commands and rendering.

/// Command execution and chat session.
pub mod app;
/// Plain-text rendering.
pub mod render;

pub use app::{App, read_image, resolve_question};
