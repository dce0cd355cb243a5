//! Generative-AI client for transcripts and highlight segments.
//!
//! The pipeline talks to the [`TranscriptExtractor`] trait; [`GeminiClient`]
//! implements it against the Gemini `generateContent` REST API.

pub mod client;
pub mod error;
pub mod parse;
pub mod types;

pub use client::{build_prompt, GeminiClient, GeminiConfig, TranscriptExtractor};
pub use error::{AiError, AiResult};
pub use parse::parse_analysis;
pub use types::AnalysisInput;
