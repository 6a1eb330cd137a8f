//! Google Gemini vision model adapter.

mod client;
mod dto;

pub use client::{DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, GEMINI_API_BASE, GeminiClient, GeminiConfig};
