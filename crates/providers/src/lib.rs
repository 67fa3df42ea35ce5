//! Language-model judges behind a fallback chain, with per-provider cost
//! ledgers and a provider-agnostic response normalizer.
//!
//! # Key types
//!
//! - [`ProviderChain`]: priority-ordered fallback over [`Provider`]s, with per-provider health
//! - [`HttpProvider`]: Anthropic, OpenAI and Google clients over `reqwest`
//! - [`CostTracker`]: thread-safe running cost of one provider
//! - [`ParsedAttempt`]: JSON, then pattern, then default score extraction

mod anthropic;
pub mod chain;
pub mod client;
pub mod config;
pub mod cost;
mod google;
pub mod http;
pub mod normalize;
mod openai;
pub mod pricing;
pub mod prompt;
pub mod types;

pub use chain::{ChainError, ProviderChain, ProviderHealth, DEFAULT_COOLDOWN, MAX_CONSECUTIVE_FAILURES};
pub use client::{build_response, HttpProvider, Provider};
pub use config::ProvidersConfig;
pub use cost::{CostStats, CostTracker};
pub use normalize::{normalize, ParsedAttempt, ParsedResponse};
pub use prompt::format_evaluation_prompt;
pub use types::{EvaluationOptions, ProviderError, ProviderKind, ProviderResponse, Usage};
