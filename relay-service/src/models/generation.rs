use serde_json::Value;

/// Outcome of a successful generation call.
///
/// `Passthrough` means the upstream answered 2xx but the reply carried no
/// usable text at `candidates[0].content.parts[0].text` (for example a
/// safety block or a changed response shape). The decoded payload is kept
/// as-is so the caller can inspect it.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    Text(String),
    Passthrough(Value),
}

impl GenerationResult {
    pub fn from_payload(payload: Value) -> Self {
        match extract_text(&payload) {
            Some(text) => GenerationResult::Text(text.to_string()),
            None => GenerationResult::Passthrough(payload),
        }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self, GenerationResult::Passthrough(_))
    }

    /// Short label for logs, metrics and the `x-relay-result` header.
    pub fn label(&self) -> &'static str {
        match self {
            GenerationResult::Text(_) => "text",
            GenerationResult::Passthrough(_) => "passthrough",
        }
    }
}

/// Walks `candidates[0].content.parts[0].text`. Any missing or wrong-shaped
/// step counts as absence, and so does an empty string.
pub fn extract_text(payload: &Value) -> Option<&str> {
    payload
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .and_then(|parts| parts.first())
        .and_then(|part| part.get("text"))
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}
