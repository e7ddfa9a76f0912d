use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    /// A third-party API answered with a non-success status. The status is
    /// passed through to the caller together with whatever payload it sent.
    #[error("Upstream {kind} returned HTTP {status}")]
    Upstream {
        kind: String,
        status: u16,
        payload: Option<serde_json::Value>,
    },

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    pub fn upstream(kind: impl Into<String>, status: u16) -> Self {
        AppError::Upstream {
            kind: kind.into(),
            status,
            payload: None,
        }
    }

    pub fn upstream_with_payload(
        kind: impl Into<String>,
        status: u16,
        payload: serde_json::Value,
    ) -> Self {
        AppError::Upstream {
            kind: kind.into(),
            status,
            payload: Some(payload),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::InternalError(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

/// First human-readable message carried by a set of validation failures.
fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(_, errs)| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Validation error".to_string())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            status: Option<u16>,
            #[serde(skip_serializing_if = "Option::is_none")]
            payload: Option<serde_json::Value>,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let status = self.status_code();

        let body = match self {
            AppError::ValidationError(err) => ErrorResponse {
                error: first_validation_message(&err),
                status: None,
                payload: None,
                details: None,
            },
            AppError::Upstream {
                kind,
                status: upstream_status,
                payload,
            } => ErrorResponse {
                error: kind,
                status: Some(upstream_status),
                payload,
                details: None,
            },
            AppError::InternalError(err) => ErrorResponse {
                error: "Server error".to_string(),
                status: None,
                payload: None,
                details: Some(format!("{:#}", err)),
            },
            AppError::ConfigError(err) => ErrorResponse {
                error: "Configuration error".to_string(),
                status: None,
                payload: None,
                details: Some(err.to_string()),
            },
        };

        (status, Json(body)).into_response()
    }
}
