//! The [`Provider`] seam and its HTTP implementation.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use url::Url;

use crate::config::ProvidersConfig;
use crate::cost::CostTracker;
use crate::http::HttpTransport;
use crate::normalize::ParsedAttempt;
use crate::types::{EvaluationOptions, ProviderError, ProviderKind, ProviderResponse, Usage};
use crate::{anthropic, google, openai};

/// One language-model vendor that can score a prompt.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// False when the provider cannot be called at all, e.g. no
    /// credential. The chain skips unavailable providers.
    fn is_available(&self) -> bool;

    fn cost_tracker(&self) -> &Arc<CostTracker>;

    async fn send(
        &self,
        prompt: &str,
        options: &EvaluationOptions,
    ) -> Result<ProviderResponse, ProviderError>;
}

/// Normalize raw output, record its cost and assemble the response.
pub fn build_response(
    tracker: &CostTracker,
    model: &str,
    raw: String,
    usage: Usage,
    duration_ms: u64,
) -> ProviderResponse {
    let attempt = ParsedAttempt::resolve(&raw);
    if matches!(attempt, ParsedAttempt::Default(_)) {
        tracing::warn!(provider = tracker.provider(), model, "Unparseable provider output, using default score");
    }
    let parsed = attempt.into_response();
    let cost = tracker.calculate(model, &usage);
    ProviderResponse {
        provider: tracker.provider().to_string(),
        model: model.to_string(),
        score: parsed.score,
        reasoning: parsed.reasoning,
        raw_response: raw,
        usage,
        cost,
        duration_ms,
    }
}

/// Anthropic, OpenAI or Google over HTTPS.
pub struct HttpProvider {
    kind: ProviderKind,
    api_key: Option<String>,
    base_url: Url,
    default_model: String,
    transport: HttpTransport,
    tracker: Arc<CostTracker>,
}

impl HttpProvider {
    pub fn new(
        kind: ProviderKind,
        api_key: Option<String>,
        config: &ProvidersConfig,
    ) -> Result<Self, ProviderError> {
        let base = config.base_url_for(kind);
        let base_url = Url::parse(base)
            .map_err(|e| ProviderError::NotConfigured(format!("invalid base URL '{base}': {e}")))?;
        Ok(Self {
            kind,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url,
            default_model: config.model_for(kind).to_string(),
            transport: HttpTransport::new(kind.name(), config.timeout_secs, config.max_retries)?,
            tracker: Arc::new(CostTracker::new(kind.name())),
        })
    }

    /// Read the API key from the provider's environment variable.
    pub fn from_env(kind: ProviderKind, config: &ProvidersConfig) -> Result<Self, ProviderError> {
        let key = std::env::var(kind.env_var()).ok();
        if key.is_none() {
            tracing::debug!(provider = kind.name(), var = kind.env_var(), "API key not set");
        }
        Self::new(kind, key, config)
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn call(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
        options: &EvaluationOptions,
    ) -> Result<(String, Usage), ProviderError> {
        match self.kind {
            ProviderKind::Anthropic => {
                let url = anthropic::endpoint(&self.base_url)?;
                let body = anthropic::request(model, prompt, options);
                let headers = [("x-api-key", api_key), ("anthropic-version", anthropic::API_VERSION)];
                let reply = self.transport.post_json(&url, &headers, &body).await?;
                anthropic::parse_reply(&reply)
            }
            ProviderKind::OpenAi => {
                let url = openai::endpoint(&self.base_url)?;
                let body = openai::request(model, prompt, options);
                let bearer = format!("Bearer {api_key}");
                let reply = self
                    .transport
                    .post_json(&url, &[("authorization", bearer.as_str())], &body)
                    .await?;
                openai::parse_reply(&reply)
            }
            ProviderKind::Google => {
                let url = google::endpoint(&self.base_url, model, api_key)?;
                let body = google::request(prompt, options);
                let reply = self.transport.post_json(&url, &[], &body).await?;
                google::parse_reply(&reply)
            }
        }
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn cost_tracker(&self) -> &Arc<CostTracker> {
        &self.tracker
    }

    async fn send(
        &self,
        prompt: &str,
        options: &EvaluationOptions,
    ) -> Result<ProviderResponse, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured(format!("{} is not set", self.kind.env_var())))?;
        let model = options.model.as_deref().unwrap_or(&self.default_model);

        let started = Instant::now();
        let (raw, usage) = self.call(api_key, model, prompt, options).await?;
        let duration_ms = started.elapsed().as_millis() as u64;

        let response = build_response(&self.tracker, model, raw, usage, duration_ms);
        tracing::debug!(
            provider = self.name(),
            model,
            score = response.score,
            cost = response.cost,
            duration_ms,
            "Provider call complete"
        );
        Ok(response)
    }
}
