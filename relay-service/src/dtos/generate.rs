use crate::models::GenerationResult;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Prompt required"))]
    pub prompt: String,

    /// Positive token budget; anything else means "use the default".
    #[serde(default, deserialize_with = "positive_token_budget")]
    pub max_tokens: Option<u32>,

    /// Accepted for client compatibility. The upstream model is fixed.
    #[serde(default)]
    pub model: Option<Value>,
}

fn positive_token_budget<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let budget = match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    Ok(budget.filter(|v| *v > 0))
}

/// Success body: `{"text": ...}` or `{"output": ...}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerateResponse {
    Text(String),
    Output(Value),
}

impl From<GenerationResult> for GenerateResponse {
    fn from(result: GenerationResult) -> Self {
        match result {
            GenerationResult::Text(text) => GenerateResponse::Text(text),
            GenerationResult::Passthrough(payload) => GenerateResponse::Output(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::parse_body;
    use serde_json::json;

    #[test]
    fn full_request_is_decoded() {
        let req: GenerateRequest =
            parse_body(br#"{"prompt": "hi", "maxTokens": 1000, "model": "gemini-2.5-flash"}"#);
        assert_eq!(req.prompt, "hi");
        assert_eq!(req.max_tokens, Some(1000));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn non_positive_or_garbage_budgets_mean_default() {
        for body in [
            r#"{"prompt": "p", "maxTokens": 0}"#,
            r#"{"prompt": "p", "maxTokens": -5}"#,
            r#"{"prompt": "p", "maxTokens": 1.5}"#,
            r#"{"prompt": "p", "maxTokens": "lots"}"#,
            r#"{"prompt": "p", "maxTokens": null}"#,
            r#"{"prompt": "p"}"#,
        ] {
            let req: GenerateRequest = parse_body(body.as_bytes());
            assert_eq!(req.prompt, "p", "body: {body}");
            assert_eq!(req.max_tokens, None, "body: {body}");
        }
    }

    #[test]
    fn numeric_string_budget_is_accepted() {
        let req: GenerateRequest = parse_body(br#"{"prompt": "p", "maxTokens": " 256 "}"#);
        assert_eq!(req.max_tokens, Some(256));
    }

    #[test]
    fn missing_or_unreadable_prompt_fails_validation() {
        let bodies: [&[u8]; 6] = [
            b"",
            b"not json",
            b"[]",
            br#"{"maxTokens": 10}"#,
            br#"{"prompt": ""}"#,
            br#"{"prompt": 42}"#,
        ];

        for body in bodies {
            let req: GenerateRequest = parse_body(body);
            assert!(req.validate().is_err());
        }
    }

    #[test]
    fn responses_use_single_key_objects() {
        let text = serde_json::to_value(GenerateResponse::Text("T".into())).unwrap();
        assert_eq!(text, json!({"text": "T"}));

        let output = serde_json::to_value(GenerateResponse::Output(json!({"a": 1}))).unwrap();
        assert_eq!(output, json!({"output": {"a": 1}}));
    }
}
