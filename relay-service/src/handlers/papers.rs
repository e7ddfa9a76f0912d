use crate::dtos::{parse_body, PapersRequest, PapersResponse};
use crate::startup::AppState;
use axum::{body::Bytes, extract::State, Json};
use service_core::error::AppError;
use validator::Validate;

pub async fn search_papers(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PapersResponse>, AppError> {
    let request: PapersRequest = parse_body(&body);
    request.validate()?;

    let papers = state
        .paper_source
        .search(&request.query)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, query = %request.query, "Paper search failed");
            AppError::from(e)
        })?;

    tracing::info!(count = papers.len(), query = %request.query, "Paper search completed");

    Ok(Json(PapersResponse { papers }))
}
