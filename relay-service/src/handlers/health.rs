use crate::dtos::StatusResponse;
use crate::services::get_metrics;
use axum::{http::header, response::IntoResponse, Json};
use serde_json::json;

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "relay-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Plain `OPTIONS` acknowledgement. Browser preflights carrying CORS headers
/// are answered by the CORS layer before reaching this handler.
pub async fn preflight() -> Json<StatusResponse> {
    Json(StatusResponse::ok())
}

pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        get_metrics(),
    )
}
