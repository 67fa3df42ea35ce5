//! OpenAI Chat Completions wire format.

use serde_json::{json, Value};
use url::Url;

use crate::prompt::SYSTEM_PROMPT;
use crate::types::{EvaluationOptions, ProviderError, Usage};

pub(crate) fn endpoint(base: &Url) -> Result<Url, ProviderError> {
    base.join("/v1/chat/completions")
        .map_err(|e| ProviderError::NotConfigured(format!("bad base URL: {e}")))
}

pub(crate) fn request(model: &str, prompt: &str, options: &EvaluationOptions) -> Value {
    let mut body = json!({
        "model": model,
        "temperature": options.temperature,
        "max_tokens": options.max_tokens,
        "messages": [
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": prompt},
        ],
    });
    if options.json_mode {
        body["response_format"] = json!({"type": "json_object"});
    }
    body
}

pub(crate) fn parse_reply(body: &Value) -> Result<(String, Usage), ProviderError> {
    let text = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::InvalidResponse("missing choices[0].message.content".into()))?
        .to_string();
    let tokens = |key: &str| {
        body.get("usage")
            .and_then(|u| u.get(key))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };
    let mut usage = Usage::new(tokens("prompt_tokens"), tokens("completion_tokens"));
    if let Some(total) = body.pointer("/usage/total_tokens").and_then(Value::as_u64) {
        usage.total_tokens = total;
    }
    Ok((text, usage))
}
