//! Inference service boundary.
//!
//! The whole core consumes semantic reasoning through one contract:
//! `infer(prompt) -> text`. Structure is never guaranteed by the service;
//! call sites recover it through [`structured::parse_structured`].

pub mod http;
pub mod structured;

pub use http::HttpInferenceClient;
pub use structured::{parse_structured, StructuredParseError};

use crate::types::Result;
use async_trait::async_trait;

/// Client for the external semantic-reasoning service.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Send one prompt and return the raw response text.
    async fn infer(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logging and diagnostics.
    fn model_name(&self) -> &str;
}
