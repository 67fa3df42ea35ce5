//! Bridges between the engine traits and real crate types (symbolic, providers).

use std::sync::Arc;

use async_trait::async_trait;
use providers::{EvaluationOptions, ProviderChain};
use symbolic::{EquivalenceVerdict, ProofStep, SymbolicVerifier};

use crate::consensus::agreement;
use crate::engine::{EquationChecker, JudgeError, JudgeVerdict, SemanticJudge};
use crate::heuristic::claim_score;

// ---------------------------------------------------------------------------
// EquationChecker for SymbolicVerifier
// ---------------------------------------------------------------------------

#[async_trait]
impl EquationChecker for SymbolicVerifier {
    async fn check(&self, lhs: &str, rhs: &str) -> EquivalenceVerdict {
        self.check_equation(lhs, rhs).await
    }
}

/// Claim text sent to a judge: the prose claim plus the equation, if any.
fn claim_text(step: &ProofStep) -> String {
    match (step.claim.trim(), &step.equation) {
        (claim, Some(eq)) if !claim.is_empty() => format!("{claim}\n{}", eq.as_text()),
        (_, Some(eq)) => eq.as_text(),
        (claim, None) => claim.to_string(),
    }
}

// ---------------------------------------------------------------------------
// ChainJudge: language models behind a fallback chain
// ---------------------------------------------------------------------------

/// Scores each step through a [`ProviderChain`]: the first provider that
/// answers, or every usable provider with their agreement attached.
pub struct ChainJudge {
    chain: Arc<ProviderChain>,
    options: EvaluationOptions,
    all_providers: bool,
}

impl ChainJudge {
    pub fn new(chain: Arc<ProviderChain>, options: EvaluationOptions) -> Self {
        Self {
            chain,
            options,
            all_providers: false,
        }
    }

    /// Ask every usable provider; the verdict score is their mean.
    pub fn across_providers(chain: Arc<ProviderChain>, options: EvaluationOptions) -> Self {
        Self {
            all_providers: true,
            ..Self::new(chain, options)
        }
    }

    pub fn chain(&self) -> &Arc<ProviderChain> {
        &self.chain
    }
}

#[async_trait]
impl SemanticJudge for ChainJudge {
    async fn judge(&self, step: &ProofStep) -> Result<JudgeVerdict, JudgeError> {
        let claim = claim_text(step);
        if !self.all_providers {
            let response = self
                .chain
                .evaluate(&claim, &step.reasoning, &self.options)
                .await?;
            return Ok(JudgeVerdict {
                score: response.score,
                reasoning: response.reasoning,
                source: format!("{}/{}", response.provider, response.model),
                agreement: None,
            });
        }

        let responses = self
            .chain
            .evaluate_all(&claim, &step.reasoning, &self.options)
            .await?;
        let scores: Vec<f64> = responses.iter().map(|r| f64::from(r.score)).collect();
        let spread = agreement(&scores);
        tracing::debug!(
            step = %step.id,
            models = responses.len(),
            mean = spread.mean,
            coherence = spread.coherence,
            "Judge panel scored step"
        );
        let sources: Vec<String> = responses
            .iter()
            .map(|r| format!("{}/{}", r.provider, r.model))
            .collect();
        let reasoning = responses
            .into_iter()
            .next()
            .map(|r| r.reasoning)
            .unwrap_or_default();
        Ok(JudgeVerdict {
            score: spread.mean.clamp(0.0, 100.0) as u8,
            reasoning,
            source: sources.join("+"),
            agreement: Some(spread),
        })
    }
}

// ---------------------------------------------------------------------------
// OfflineJudge: deterministic claim heuristic
// ---------------------------------------------------------------------------

/// Judge that never leaves the process; scores the claim with [`claim_score`].
pub struct OfflineJudge;

#[async_trait]
impl SemanticJudge for OfflineJudge {
    async fn judge(&self, step: &ProofStep) -> Result<JudgeVerdict, JudgeError> {
        Ok(JudgeVerdict {
            score: claim_score(&claim_text(step)),
            reasoning: "offline heuristic".to_string(),
            source: "offline".to_string(),
            agreement: None,
        })
    }
}
