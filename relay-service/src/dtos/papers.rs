use crate::models::PaperRecord;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct PapersRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Query required"))]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct PapersResponse {
    pub papers: Vec<PaperRecord>,
}
