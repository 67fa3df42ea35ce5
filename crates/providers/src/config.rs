use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::ProviderKind;

/// Provider settings from the `[providers]` TOML section. API keys are
/// never read from here, only from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Fallback priority, first entry tried first.
    #[serde(default = "default_order")]
    pub order: Vec<ProviderKind>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per request, including the first.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Model overrides keyed by provider name.
    #[serde(default)]
    pub models: HashMap<String, String>,

    /// Endpoint overrides keyed by provider name (proxies, test servers).
    #[serde(default)]
    pub base_urls: HashMap<String, String>,
}

fn default_order() -> Vec<ProviderKind> {
    ProviderKind::ALL.to_vec()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> usize {
    3
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            order: default_order(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            models: HashMap::new(),
            base_urls: HashMap::new(),
        }
    }
}

impl ProvidersConfig {
    pub fn model_for(&self, kind: ProviderKind) -> &str {
        self.models
            .get(kind.name())
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_model())
    }

    pub fn base_url_for(&self, kind: ProviderKind) -> &str {
        self.base_urls
            .get(kind.name())
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_base_url())
    }
}
