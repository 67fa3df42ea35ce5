//! Google Generative Language `generateContent` wire format.

use serde_json::{json, Value};
use url::Url;

use crate::prompt::SYSTEM_PROMPT;
use crate::types::{EvaluationOptions, ProviderError, Usage};

/// The key travels as a query parameter.
pub(crate) fn endpoint(base: &Url, model: &str, api_key: &str) -> Result<Url, ProviderError> {
    let mut url = base
        .join(&format!("/v1beta/models/{model}:generateContent"))
        .map_err(|e| ProviderError::NotConfigured(format!("bad base URL: {e}")))?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url)
}

pub(crate) fn request(prompt: &str, options: &EvaluationOptions) -> Value {
    let mut generation = json!({
        "temperature": options.temperature,
        "maxOutputTokens": options.max_tokens,
    });
    if options.json_mode {
        generation["responseMimeType"] = json!("application/json");
    }
    json!({
        "systemInstruction": {"parts": [{"text": SYSTEM_PROMPT}]},
        "contents": [{"role": "user", "parts": [{"text": prompt}]}],
        "generationConfig": generation,
    })
}

pub(crate) fn parse_reply(body: &Value) -> Result<(String, Usage), ProviderError> {
    let parts = body
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::InvalidResponse("missing candidates[0].content.parts".into()))?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    let tokens = |key: &str| {
        body.get("usageMetadata")
            .and_then(|u| u.get(key))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };
    let mut usage = Usage::new(tokens("promptTokenCount"), tokens("candidatesTokenCount"));
    if let Some(total) = body
        .pointer("/usageMetadata/totalTokenCount")
        .and_then(Value::as_u64)
    {
        usage.total_tokens = total;
    }
    Ok((text, usage))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_carries_key() {
        let base = Url::parse("https://generativelanguage.googleapis.com").unwrap();
        let url = endpoint(&base, "gemini-1.5-pro", "k123").unwrap();
        assert_eq!(url.path(), "/v1beta/models/gemini-1.5-pro:generateContent");
        assert_eq!(url.query(), Some("key=k123"));
    }

    #[test]
    fn test_request_shape() {
        let body = request("p", &EvaluationOptions::default());
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 500);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "p");
    }

    #[test]
    fn test_usage_metadata() {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": "{\"score\": 95, \"reasoning\": \"Excellent proof validation\"}"}]}}],
            "usageMetadata": {"promptTokenCount": 1800, "candidatesTokenCount": 500, "totalTokenCount": 2300}
        });
        let (text, usage) = parse_reply(&body).unwrap();
        assert!(text.contains("95"));
        assert_eq!(usage.total_tokens, 2300);
        assert_eq!(usage.completion_tokens, 500);
    }
}
