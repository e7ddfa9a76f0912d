//! Upstream provider abstractions and implementations.
//!
//! Handlers talk to the generative-text API and the paper search feed only
//! through these traits, so tests can swap in the mocks.

pub mod arxiv;
pub mod gemini;
pub mod mock;

use crate::models::{GenerationResult, PaperRecord};
use async_trait::async_trait;
use service_core::error::AppError;
use thiserror::Error;

/// Error kind reported to callers when the generation API answers non-2xx.
pub const GEMINI_ERROR_KIND: &str = "gemini_error";

/// Error kind reported to callers when the paper feed answers non-2xx.
pub const ARXIV_ERROR_KIND: &str = "arxiv_error";

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// The upstream answered with a non-success status.
    #[error("{kind}: upstream returned HTTP {status}")]
    Upstream {
        kind: &'static str,
        status: u16,
        payload: Option<serde_json::Value>,
    },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Failed to decode upstream response: {0}")]
    DecodeError(String),

    #[error("Malformed feed: {0}")]
    FeedError(String),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Upstream {
                kind,
                status,
                payload: Some(payload),
            } => AppError::upstream_with_payload(kind, status, payload),
            ProviderError::Upstream {
                kind,
                status,
                payload: None,
            } => AppError::upstream(kind, status),
            other => AppError::InternalError(anyhow::Error::new(other)),
        }
    }
}

/// Generation parameters for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationParams {
    /// Maximum output tokens.
    pub max_tokens: u32,
}

/// Trait for text generation providers (e.g., Gemini).
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Send one prompt upstream and normalize the reply.
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<GenerationResult, ProviderError>;
}

/// Trait for academic paper search backends (e.g., arXiv).
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Run one search and return at most the configured number of records,
    /// in feed order.
    async fn search(&self, query: &str) -> Result<Vec<PaperRecord>, ProviderError>;
}
