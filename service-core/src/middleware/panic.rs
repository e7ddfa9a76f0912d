use crate::error::AppError;
use axum::response::{IntoResponse, Response};
use std::any::Any;

/// Converts a handler panic into the same JSON 500 body as any other
/// internal failure. Install with `CatchPanicLayer::custom(panic_response)`.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };

    tracing::error!(details = %details, "Request handler panicked");

    AppError::InternalError(anyhow::anyhow!(details)).into_response()
}
