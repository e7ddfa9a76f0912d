use crate::dtos::{parse_body, GenerateRequest, GenerateResponse};
use crate::services::providers::GenerationParams;
use crate::startup::AppState;
use axum::{body::Bytes, extract::State, response::IntoResponse, Json};
use metrics::counter;
use service_core::error::AppError;
use validator::Validate;

/// Tells the caller whether `/api/generate` produced extracted text or fell
/// back to the raw upstream payload.
pub const RESULT_HEADER: &str = "x-relay-result";

pub async fn generate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let request: GenerateRequest = parse_body(&body);

    tracing::debug!(
        prompt_len = request.prompt.len(),
        max_tokens = ?request.max_tokens,
        model = ?request.model,
        "Received generation request"
    );

    request.validate().map_err(|e| {
        tracing::warn!("Generation request rejected: no prompt");
        AppError::from(e)
    })?;

    let params = GenerationParams {
        max_tokens: request
            .max_tokens
            .unwrap_or(state.config.gemini.default_max_tokens),
    };

    let result = state
        .text_provider
        .generate(&request.prompt, &params)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Generation failed");
            AppError::from(e)
        })?;

    let label = result.label();
    if result.is_passthrough() {
        counter!("relay_generation_passthrough_total").increment(1);
        tracing::warn!("Upstream reply had no text part; returning raw payload");
    } else {
        tracing::debug!(result = label, "Generation succeeded");
    }

    Ok(([(RESULT_HEADER, label)], Json(GenerateResponse::from(result))))
}
