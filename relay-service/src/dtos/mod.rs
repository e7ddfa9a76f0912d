pub mod generate;
pub mod papers;

pub use generate::{GenerateRequest, GenerateResponse};
pub use papers::{PapersRequest, PapersResponse};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Body of the `OPTIONS` acknowledgements.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}

/// Decode a JSON request body, treating anything unreadable (empty body,
/// invalid JSON, wrong field types) as an empty request. Validation then
/// reports the missing field instead of the client seeing a decoder error.
pub fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            if !body.is_empty() {
                tracing::debug!(error = %e, "Unreadable request body treated as empty");
            }
            T::default()
        }
    }
}
