use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::client::{HttpProvider, Provider};
use crate::config::ProvidersConfig;
use crate::cost::CostStats;
use crate::prompt::format_evaluation_prompt;
use crate::types::{EvaluationOptions, ProviderError, ProviderResponse};

/// Failure of a whole fallback chain.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Every provider was skipped before a call was made.
    #[error("no provider available (set ANTHROPIC_API_KEY, OPENAI_API_KEY or GOOGLE_API_KEY)")]
    NoProviderAvailable,

    /// At least one provider was called and every call failed.
    #[error("all providers exhausted: {}", attempts.join("; "))]
    AllProvidersExhausted { attempts: Vec<String> },
}

/// Consecutive transient failures that take a provider out of rotation.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// How long a provider benched for transient failures sits out.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Chain-side state of one provider.
#[derive(Debug, Default)]
struct HealthEntry {
    consecutive_failures: u32,
    /// Last transient failure that benched the provider.
    benched_at: Option<Instant>,
    /// Unavailability-class failure; out for the chain's lifetime.
    disabled: Option<String>,
    last_error: Option<String>,
}

/// Snapshot of one provider's standing in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub provider: String,
    pub usable: bool,
    pub consecutive_failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Priority-ordered providers; the first successful response wins.
///
/// A provider that fails with an unavailability-class error is disabled
/// for the lifetime of the chain. [`MAX_CONSECUTIVE_FAILURES`] transient
/// failures in a row bench it until the cooldown has passed; a success
/// clears the count.
pub struct ProviderChain {
    providers: Vec<Arc<dyn Provider>>,
    health: Mutex<HashMap<String, HealthEntry>>,
    cooldown: Duration,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self {
            providers,
            health: Mutex::new(HashMap::new()),
            cooldown: DEFAULT_COOLDOWN,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Build HTTP providers in `config.order`, keys from the environment.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, ProviderError> {
        let mut providers: Vec<Arc<dyn Provider>> = Vec::with_capacity(config.order.len());
        for kind in &config.order {
            providers.push(Arc::new(HttpProvider::from_env(*kind, config)?));
        }
        let chain = Self::new(providers);
        tracing::info!(available = ?chain.available(), "Provider chain ready");
        Ok(chain)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn health_map(&self) -> MutexGuard<'_, HashMap<String, HealthEntry>> {
        self.health.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Why `provider` would be skipped right now, if it would be.
    fn skip_reason(&self, provider: &dyn Provider) -> Option<String> {
        if !provider.is_available() {
            return Some("not configured".to_string());
        }
        let mut health = self.health_map();
        let entry = health.get_mut(provider.name())?;
        if let Some(reason) = &entry.disabled {
            return Some(reason.clone());
        }
        let benched_at = entry.benched_at?;
        if benched_at.elapsed() >= self.cooldown {
            tracing::info!(provider = provider.name(), "Provider back in rotation after cooldown");
            entry.benched_at = None;
            entry.consecutive_failures = 0;
            return None;
        }
        Some(format!(
            "{} consecutive failures, last: {}",
            entry.consecutive_failures,
            entry.last_error.as_deref().unwrap_or("unknown")
        ))
    }

    fn usable(&self, provider: &dyn Provider) -> bool {
        self.skip_reason(provider).is_none()
    }

    fn record_success(&self, name: &str) {
        if let Some(entry) = self.health_map().get_mut(name) {
            entry.consecutive_failures = 0;
        }
    }

    fn record_failure(&self, name: &str, error: &ProviderError) {
        let mut health = self.health_map();
        let entry = health.entry(name.to_string()).or_default();
        entry.last_error = Some(error.to_string());
        if error.is_unavailability() {
            tracing::warn!(provider = name, error = %error, "Provider disabled for this chain");
            entry.disabled = Some(error.to_string());
            return;
        }
        entry.consecutive_failures += 1;
        if entry.consecutive_failures >= MAX_CONSECUTIVE_FAILURES && entry.benched_at.is_none() {
            tracing::warn!(
                provider = name,
                consecutive_failures = entry.consecutive_failures,
                cooldown_secs = self.cooldown.as_secs(),
                "Provider benched after repeated failures"
            );
            entry.benched_at = Some(Instant::now());
        }
    }

    /// Standing of every provider, in chain order.
    pub fn health(&self) -> Vec<ProviderHealth> {
        self.providers
            .iter()
            .map(|p| {
                let reason = self.skip_reason(p.as_ref());
                let consecutive_failures = self
                    .health_map()
                    .get(p.name())
                    .map_or(0, |e| e.consecutive_failures);
                ProviderHealth {
                    provider: p.name().to_string(),
                    usable: reason.is_none(),
                    consecutive_failures,
                    reason,
                }
            })
            .collect()
    }

    /// Names of providers that would currently be tried, in order.
    pub fn available(&self) -> Vec<String> {
        self.providers
            .iter()
            .filter(|p| self.usable(p.as_ref()))
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Send a raw prompt through the chain.
    pub async fn send(
        &self,
        prompt: &str,
        options: &EvaluationOptions,
    ) -> Result<ProviderResponse, ChainError> {
        let mut attempts = Vec::new();
        for provider in &self.providers {
            let name = provider.name();
            if let Some(reason) = self.skip_reason(provider.as_ref()) {
                tracing::warn!(provider = name, reason = %reason, "Provider unavailable, skipping");
                continue;
            }
            match provider.send(prompt, options).await {
                Ok(response) => {
                    self.record_success(name);
                    return Ok(response);
                }
                Err(e) => {
                    tracing::warn!(provider = name, error = %e, "Provider failed, falling back");
                    self.record_failure(name, &e);
                    attempts.push(format!("{name}: {e}"));
                }
            }
        }
        if attempts.is_empty() {
            Err(ChainError::NoProviderAvailable)
        } else {
            Err(ChainError::AllProvidersExhausted { attempts })
        }
    }

    /// Ask the chain to score a claim and its justification.
    pub async fn evaluate(
        &self,
        claim: &str,
        reasoning: &str,
        options: &EvaluationOptions,
    ) -> Result<ProviderResponse, ChainError> {
        self.send(&format_evaluation_prompt(claim, reasoning), options)
            .await
    }

    /// Score a claim on every usable provider at once, for cross-model
    /// agreement. Successful responses come back in chain order; failures
    /// are logged and dropped. Errors only when nothing succeeded.
    pub async fn evaluate_all(
        &self,
        claim: &str,
        reasoning: &str,
        options: &EvaluationOptions,
    ) -> Result<Vec<ProviderResponse>, ChainError> {
        let prompt = Arc::new(format_evaluation_prompt(claim, reasoning));
        let mut tasks = JoinSet::new();
        for (index, provider) in self.providers.iter().enumerate() {
            if let Some(reason) = self.skip_reason(provider.as_ref()) {
                tracing::warn!(provider = provider.name(), reason = %reason, "Provider unavailable, skipping");
                continue;
            }
            let provider = Arc::clone(provider);
            let prompt = Arc::clone(&prompt);
            let options = options.clone();
            tasks.spawn(async move {
                let result = provider.send(&prompt, &options).await;
                (index, provider.name().to_string(), result)
            });
        }

        let mut responses = Vec::new();
        let mut attempts = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, name, Ok(response))) => {
                    self.record_success(&name);
                    responses.push((index, response));
                }
                Ok((_, name, Err(e))) => {
                    tracing::warn!(provider = %name, error = %e, "Provider failed");
                    self.record_failure(&name, &e);
                    attempts.push(format!("{name}: {e}"));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Provider task failed");
                    attempts.push(format!("task: {e}"));
                }
            }
        }

        if responses.is_empty() {
            return Err(if attempts.is_empty() {
                ChainError::NoProviderAvailable
            } else {
                ChainError::AllProvidersExhausted { attempts }
            });
        }
        responses.sort_by_key(|(index, _)| *index);
        Ok(responses.into_iter().map(|(_, r)| r).collect())
    }

    /// Ledger snapshot of every provider, in chain order.
    pub fn ledger_stats(&self) -> Vec<CostStats> {
        self.providers
            .iter()
            .map(|p| p.cost_tracker().stats())
            .collect()
    }

    pub fn total_cost(&self) -> f64 {
        self.providers
            .iter()
            .map(|p| p.cost_tracker().total_cost())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::client::build_response;
    use crate::cost::CostTracker;
    use crate::types::Usage;

    enum Script {
        Reply(&'static str),
        Fail(fn() -> ProviderError),
    }

    struct ScriptedProvider {
        name: &'static str,
        available: bool,
        script: Script,
        calls: AtomicUsize,
        tracker: Arc<CostTracker>,
    }

    impl ScriptedProvider {
        fn new(name: &'static str, available: bool, script: Script) -> Arc<Self> {
            Arc::new(Self {
                name,
                available,
                script,
                calls: AtomicUsize::new(0),
                tracker: Arc::new(CostTracker::new(name)),
            })
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn cost_tracker(&self) -> &Arc<CostTracker> {
            &self.tracker
        }

        async fn send(
            &self,
            _prompt: &str,
            _options: &EvaluationOptions,
        ) -> Result<ProviderResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.script {
                Script::Reply(raw) => Ok(build_response(
                    &self.tracker,
                    "claude-3-5-sonnet-20240620",
                    raw.to_string(),
                    Usage::new(1000, 500),
                    1,
                )),
                Script::Fail(make) => Err(make()),
            }
        }
    }

    fn chain(providers: Vec<Arc<ScriptedProvider>>) -> ProviderChain {
        ProviderChain::new(
            providers
                .into_iter()
                .map(|p| p as Arc<dyn Provider>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_first_available_wins() {
        let skipped = ScriptedProvider::new("anthropic", false, Script::Reply(r#"{"score": 10}"#));
        let second = ScriptedProvider::new("openai", true, Script::Reply(r#"{"score": 90, "reasoning": "ok"}"#));
        let chain = chain(vec![skipped.clone(), second.clone()]);

        let response = chain.evaluate("x = x", "reflexivity", &EvaluationOptions::default()).await.unwrap();
        assert_eq!(response.provider, "openai");
        assert_eq!(response.score, 90);
        assert_eq!(skipped.calls.load(Ordering::SeqCst), 0);
        assert_eq!(chain.available(), vec!["openai".to_string()]);
    }

    #[tokio::test]
    async fn test_failure_falls_back() {
        let flaky = ScriptedProvider::new("anthropic", true, Script::Fail(|| ProviderError::Timeout(30)));
        let backup = ScriptedProvider::new("google", true, Script::Reply("score: 66"));
        let chain = chain(vec![flaky.clone(), backup]);

        let response = chain.send("p", &EvaluationOptions::default()).await.unwrap();
        assert_eq!(response.score, 66);
        // A timeout is transient: the provider stays in rotation.
        assert_eq!(chain.available().len(), 2);
    }

    #[tokio::test]
    async fn test_unavailability_disables_provider() {
        let revoked = ScriptedProvider::new(
            "openai",
            true,
            Script::Fail(|| ProviderError::Unavailable("credential rejected (401)".into())),
        );
        let backup = ScriptedProvider::new("google", true, Script::Reply(r#"{"score": 70}"#));
        let chain = chain(vec![revoked.clone(), backup]);

        chain.send("p", &EvaluationOptions::default()).await.unwrap();
        chain.send("p", &EvaluationOptions::default()).await.unwrap();
        assert_eq!(revoked.calls.load(Ordering::SeqCst), 1);
        assert_eq!(chain.available(), vec!["google".to_string()]);
    }

    #[tokio::test]
    async fn test_repeated_transient_failures_bench_provider() {
        let flaky = ScriptedProvider::new("anthropic", true, Script::Fail(|| ProviderError::Timeout(30)));
        let backup = ScriptedProvider::new("google", true, Script::Reply(r#"{"score": 60}"#));
        let chain = chain(vec![flaky.clone(), backup]);

        for _ in 0..5 {
            chain.send("p", &EvaluationOptions::default()).await.unwrap();
        }
        assert_eq!(flaky.calls.load(Ordering::SeqCst), MAX_CONSECUTIVE_FAILURES as usize);
        assert_eq!(chain.available(), vec!["google".to_string()]);

        let health = chain.health();
        assert_eq!(health[0].provider, "anthropic");
        assert!(!health[0].usable);
        assert_eq!(health[0].consecutive_failures, 3);
        assert!(health[0].reason.as_deref().unwrap().contains("timed out"));
        assert!(health[1].usable);
        assert!(health[1].reason.is_none());
    }

    #[tokio::test]
    async fn test_benched_provider_returns_after_cooldown() {
        let flaky = ScriptedProvider::new("anthropic", true, Script::Fail(|| ProviderError::Timeout(30)));
        let backup = ScriptedProvider::new("google", true, Script::Reply(r#"{"score": 60}"#));
        let chain = chain(vec![flaky.clone(), backup]).with_cooldown(Duration::ZERO);

        for _ in 0..3 {
            chain.send("p", &EvaluationOptions::default()).await.unwrap();
        }
        // Zero cooldown: benched and immediately eligible again.
        assert_eq!(chain.available().len(), 2);
        chain.send("p", &EvaluationOptions::default()).await.unwrap();
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_disabled_provider_reported_in_health() {
        let revoked = ScriptedProvider::new(
            "openai",
            true,
            Script::Fail(|| ProviderError::Unavailable("credential rejected (401)".into())),
        );
        let missing = ScriptedProvider::new("google", false, Script::Reply(""));
        let chain = chain(vec![revoked, missing]);
        assert!(chain.send("p", &EvaluationOptions::default()).await.is_err());

        let health = chain.health();
        assert!(health[0].reason.as_deref().unwrap().contains("credential rejected"));
        assert_eq!(health[1].reason.as_deref(), Some("not configured"));
        let json = serde_json::to_value(&health[1]).unwrap();
        assert_eq!(json["usable"], false);
    }

    #[tokio::test]
    async fn test_none_available() {
        let chain = chain(vec![
            ScriptedProvider::new("anthropic", false, Script::Reply("")),
            ScriptedProvider::new("openai", false, Script::Reply("")),
        ]);
        let err = chain.send("p", &EvaluationOptions::default()).await.unwrap_err();
        assert!(matches!(err, ChainError::NoProviderAvailable));

        let empty = ProviderChain::new(Vec::new());
        assert!(empty.is_empty());
        assert!(matches!(
            empty.send("p", &EvaluationOptions::default()).await,
            Err(ChainError::NoProviderAvailable)
        ));
    }

    #[tokio::test]
    async fn test_all_exhausted() {
        let chain = chain(vec![
            ScriptedProvider::new("anthropic", true, Script::Fail(|| ProviderError::RateLimited { attempts: 3 })),
            ScriptedProvider::new("openai", true, Script::Fail(|| ProviderError::Http { status: 500, body: "boom".into() })),
        ]);
        match chain.send("p", &EvaluationOptions::default()).await {
            Err(ChainError::AllProvidersExhausted { attempts }) => {
                assert_eq!(attempts.len(), 2);
                assert!(attempts[0].starts_with("anthropic: rate limited"));
                assert!(attempts[1].contains("HTTP 500"));
            }
            other => panic!("expected AllProvidersExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ledger_stats_per_provider() {
        let a = ScriptedProvider::new("anthropic", true, Script::Reply(r#"{"score": 80}"#));
        let b = ScriptedProvider::new("openai", true, Script::Reply(r#"{"score": 80}"#));
        let chain = chain(vec![a, b]);
        chain.send("p", &EvaluationOptions::default()).await.unwrap();
        chain.send("p", &EvaluationOptions::default()).await.unwrap();

        let stats = chain.ledger_stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].provider, "anthropic");
        assert_eq!(stats[0].call_count, 2);
        assert!((stats[0].total_cost - 0.021).abs() < 1e-9);
        assert_eq!(stats[1].call_count, 0);
        assert!((chain.total_cost() - 0.021).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_evaluate_all_collects_in_chain_order() {
        let a = ScriptedProvider::new("anthropic", true, Script::Reply(r#"{"score": 70}"#));
        let down = ScriptedProvider::new("openai", true, Script::Fail(|| ProviderError::Timeout(30)));
        let off = ScriptedProvider::new("mistral", false, Script::Reply(r#"{"score": 1}"#));
        let g = ScriptedProvider::new("google", true, Script::Reply(r#"{"score": 90}"#));
        let chain = chain(vec![a, down.clone(), off.clone(), g]);

        let responses = chain
            .evaluate_all("x = x", "reflexivity", &EvaluationOptions::default())
            .await
            .unwrap();
        let scores: Vec<(&str, u8)> = responses.iter().map(|r| (r.provider.as_str(), r.score)).collect();
        assert_eq!(scores, vec![("anthropic", 70), ("google", 90)]);
        assert_eq!(down.calls.load(Ordering::SeqCst), 1);
        assert_eq!(off.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_evaluate_all_errors_when_nothing_succeeds() {
        let chain = chain(vec![ScriptedProvider::new(
            "anthropic",
            true,
            Script::Fail(|| ProviderError::NotConfigured("anthropic".into())),
        )]);
        let err = chain
            .evaluate_all("c", "r", &EvaluationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::AllProvidersExhausted { .. }));
        assert!(chain.available().is_empty());
        assert!(matches!(
            chain.evaluate_all("c", "r", &EvaluationOptions::default()).await,
            Err(ChainError::NoProviderAvailable)
        ));
    }
}
