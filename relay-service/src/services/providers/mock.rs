//! Mock provider implementations for testing.

use super::{
    GenerationParams, PaperSource, ProviderError, TextProvider, ARXIV_ERROR_KIND,
    GEMINI_ERROR_KIND,
};
use crate::models::{GenerationResult, PaperRecord};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Canned outcome replayed by the mocks on every call.
#[derive(Debug, Clone)]
pub enum MockReply<T> {
    Ok(T),
    Upstream { status: u16, payload: Option<Value> },
    Network(String),
    Panic(String),
}

impl<T: Clone> MockReply<T> {
    fn replay(&self, kind: &'static str) -> Result<T, ProviderError> {
        match self {
            MockReply::Ok(value) => Ok(value.clone()),
            MockReply::Upstream { status, payload } => Err(ProviderError::Upstream {
                kind,
                status: *status,
                payload: payload.clone(),
            }),
            MockReply::Network(msg) => Err(ProviderError::NetworkError(msg.clone())),
            MockReply::Panic(msg) => panic!("{}", msg),
        }
    }
}

/// Mock text provider for testing.
pub struct MockTextProvider {
    reply: MockReply<GenerationResult>,
    calls: AtomicUsize,
    last_max_tokens: AtomicU32,
}

impl MockTextProvider {
    pub fn new(reply: MockReply<GenerationResult>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_max_tokens: AtomicU32::new(0),
        }
    }

    pub fn text(text: &str) -> Self {
        Self::new(MockReply::Ok(GenerationResult::Text(text.to_string())))
    }

    /// Number of `generate` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Token budget of the most recent call, 0 before the first one.
    pub fn last_max_tokens(&self) -> u32 {
        self.last_max_tokens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(
        &self,
        _prompt: &str,
        params: &GenerationParams,
    ) -> Result<GenerationResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_max_tokens
            .store(params.max_tokens, Ordering::SeqCst);
        self.reply.replay(GEMINI_ERROR_KIND)
    }
}

/// Mock paper source for testing.
pub struct MockPaperSource {
    reply: MockReply<Vec<PaperRecord>>,
    calls: AtomicUsize,
}

impl MockPaperSource {
    pub fn new(reply: MockReply<Vec<PaperRecord>>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn papers(papers: Vec<PaperRecord>) -> Self {
        Self::new(MockReply::Ok(papers))
    }

    /// Number of `search` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaperSource for MockPaperSource {
    async fn search(&self, _query: &str) -> Result<Vec<PaperRecord>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.replay(ARXIV_ERROR_KIND)
    }
}
