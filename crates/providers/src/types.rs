//! Shared data types for provider calls.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Token accounting reported by a provider for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// The language-model vendors a judge call can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
    Google,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Anthropic,
        ProviderKind::OpenAi,
        ProviderKind::Google,
    ];

    /// Lowercase name used in price tables, config and logs.
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Google => "google",
        }
    }

    /// Environment variable holding the API key.
    pub fn env_var(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Google => "GOOGLE_API_KEY",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "claude-3-5-sonnet-20240620",
            ProviderKind::OpenAi => "gpt-4o-2024-05-13",
            ProviderKind::Google => "gemini-1.5-pro",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::OpenAi => "https://api.openai.com",
            ProviderKind::Google => "https://generativelanguage.googleapis.com",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" | "gpt" => Ok(ProviderKind::OpenAi),
            "google" | "gemini" => Ok(ProviderKind::Google),
            other => Err(ProviderError::NotConfigured(format!(
                "unknown provider '{other}'"
            ))),
        }
    }
}

/// Per-call generation options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOptions {
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Ask the provider for a JSON object when it supports it.
    #[serde(default = "default_json_mode")]
    pub json_mode: bool,
    /// Overrides the provider's configured model.
    #[serde(default)]
    pub model: Option<String>,
}

fn default_temperature() -> f64 {
    0.3
}
fn default_max_tokens() -> u32 {
    500
}
fn default_json_mode() -> bool {
    true
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            json_mode: default_json_mode(),
            model: None,
        }
    }
}

/// Normalized result of one provider call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub provider: String,
    pub model: String,
    /// Always in 0..=100.
    pub score: u8,
    pub reasoning: String,
    pub raw_response: String,
    pub usage: Usage,
    /// USD, from the provider's price table.
    pub cost: f64,
    pub duration_ms: u64,
}

/// Errors from a single provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Missing credential or unknown provider name.
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// Rejected credential or unreachable endpoint.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: usize },

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The reply did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether the provider should be skipped for the rest of a chain's
    /// lifetime. Transient failures only skip the current call.
    pub fn is_unavailability(&self) -> bool {
        matches!(
            self,
            ProviderError::NotConfigured(_) | ProviderError::Unavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = EvaluationOptions::default();
        assert!((opts.temperature - 0.3).abs() < 1e-9);
        assert_eq!(opts.max_tokens, 500);
        assert!(opts.json_mode);
        assert!(opts.model.is_none());
    }

    #[test]
    fn test_custom_options_from_json() {
        let opts: EvaluationOptions = serde_json::from_str(
            r#"{"temperature": 0.7, "max_tokens": 1000, "json_mode": false, "model": "custom-model"}"#,
        )
        .unwrap();
        assert!((opts.temperature - 0.7).abs() < 1e-9);
        assert_eq!(opts.max_tokens, 1000);
        assert!(!opts.json_mode);
        assert_eq!(opts.model.as_deref(), Some("custom-model"));
    }

    #[test]
    fn test_usage_total() {
        let usage = Usage::new(1800, 500);
        assert_eq!(usage.total_tokens, 2300);
        assert_eq!(Usage::default().total_tokens, 0);
    }

    #[test]
    fn test_provider_kind_names() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Google);
        assert!("mistral".parse::<ProviderKind>().is_err());
        assert_eq!(ProviderKind::Anthropic.to_string(), "anthropic");
        let json = serde_json::to_string(&ProviderKind::OpenAi).unwrap();
        assert_eq!(json, "\"openai\"");
    }

    #[test]
    fn test_default_models() {
        assert_eq!(
            ProviderKind::Anthropic.default_model(),
            "claude-3-5-sonnet-20240620"
        );
        assert_eq!(ProviderKind::OpenAi.default_model(), "gpt-4o-2024-05-13");
        assert_eq!(ProviderKind::Google.default_model(), "gemini-1.5-pro");
    }

    #[test]
    fn test_unavailability_classes() {
        assert!(ProviderError::NotConfigured("key".into()).is_unavailability());
        assert!(ProviderError::Unavailable("401".into()).is_unavailability());
        assert!(!ProviderError::Timeout(30).is_unavailability());
        assert!(!ProviderError::RateLimited { attempts: 3 }.is_unavailability());
    }
}
