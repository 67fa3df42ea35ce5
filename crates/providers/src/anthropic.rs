//! Anthropic Messages API wire format.

use serde_json::{json, Value};
use url::Url;

use crate::prompt::SYSTEM_PROMPT;
use crate::types::{EvaluationOptions, ProviderError, Usage};

pub const API_VERSION: &str = "2023-06-01";

pub(crate) fn endpoint(base: &Url) -> Result<Url, ProviderError> {
    base.join("/v1/messages")
        .map_err(|e| ProviderError::NotConfigured(format!("bad base URL: {e}")))
}

pub(crate) fn request(model: &str, prompt: &str, options: &EvaluationOptions) -> Value {
    json!({
        "model": model,
        "max_tokens": options.max_tokens,
        "temperature": options.temperature,
        "system": SYSTEM_PROMPT,
        "messages": [{"role": "user", "content": prompt}],
    })
}

/// Concatenated text blocks and token usage.
pub(crate) fn parse_reply(body: &Value) -> Result<(String, Usage), ProviderError> {
    let blocks = body
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::InvalidResponse("missing 'content' array".into()))?;
    let text: String = blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect();
    let usage = body.get("usage");
    let tokens = |key: &str| {
        usage
            .and_then(|u| u.get(key))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };
    Ok((text, Usage::new(tokens("input_tokens"), tokens("output_tokens"))))
}
