//! Gemini provider implementation.
//!
//! Sends a single-turn `generateContent` request and normalizes the reply.
//! The model is fixed by the configured endpoint URL.

use super::{GenerationParams, ProviderError, TextProvider, GEMINI_ERROR_KIND};
use crate::config::GeminiConfig;
use crate::models::GenerationResult;
use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini text provider.
pub struct GeminiTextProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiTextProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured(
                "Gemini API key not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn build_request<'a>(prompt: &'a str, params: &GenerationParams) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: params.max_tokens,
            },
        }
    }
}

#[async_trait]
impl TextProvider for GeminiTextProvider {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<GenerationResult, ProviderError> {
        let request = Self::build_request(prompt, params);

        tracing::debug!(
            prompt_len = prompt.len(),
            max_tokens = params.max_tokens,
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                counter!("relay_upstream_requests_total", "upstream" => "gemini", "outcome" => "network_error")
                    .increment(1);
                ProviderError::NetworkError(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            counter!("relay_upstream_requests_total", "upstream" => "gemini", "outcome" => "upstream_error")
                .increment(1);

            // Error bodies are echoed to the caller even when they are not JSON.
            let payload = serde_json::from_slice::<Value>(&body)
                .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&body) }));

            tracing::warn!(status = status.as_u16(), "Gemini API returned an error");

            return Err(ProviderError::Upstream {
                kind: GEMINI_ERROR_KIND,
                status: status.as_u16(),
                payload: Some(payload),
            });
        }

        let payload: Value = serde_json::from_slice(&body)
            .map_err(|e| ProviderError::DecodeError(format!("Gemini response: {}", e)))?;

        counter!("relay_upstream_requests_total", "upstream" => "gemini", "outcome" => "success")
            .increment(1);

        Ok(GenerationResult::from_payload(payload))
    }
}

// ============================================================================
// Gemini API Request Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}
