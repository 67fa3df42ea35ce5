//! Per-step and per-proof verification combining symbolic and heuristic evidence.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use symbolic::{EquivalenceVerdict, ProofStep};

use crate::config::{ConfigError, VerificationConfig};
use crate::consensus::{self, Consensus, ModelAgreement, SymbolicSignal};
use crate::graph::{self, GraphAnalysis};
use crate::heuristic::{plausibility_score, structural_score};

/// Errors from a semantic judge.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    /// The provider chain could not produce any response.
    #[error(transparent)]
    Chain(#[from] providers::ChainError),
    #[error("judge failed: {0}")]
    Failed(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Decides whether two expressions are equal.
#[async_trait]
pub trait EquationChecker: Send + Sync {
    async fn check(&self, lhs: &str, rhs: &str) -> EquivalenceVerdict;
}

/// Score of a step from an external judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    /// 0..=100.
    pub score: u8,
    pub reasoning: String,
    pub source: String,
    /// Spread of the individual scores when several models were asked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement: Option<ModelAgreement>,
}

/// Optional third signal: a language model or other external referee.
#[async_trait]
pub trait SemanticJudge: Send + Sync {
    async fn judge(&self, step: &ProofStep) -> Result<JudgeVerdict, JudgeError>;
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Verdict for one proof step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub step_id: String,
    /// Symbolic signal in [0, 1].
    pub symbolic_score: f64,
    /// Plausibility, averaged with the judge when one ran, in [0, 1].
    pub heuristic_score: f64,
    /// Consensus confidence in [0, 1].
    pub confidence: f64,
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equivalence: Option<EquivalenceVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_score: Option<u8>,
    /// Judge coherence (0-100) when several models scored the step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coherence: Option<f64>,
}

impl VerificationResult {
    /// Conservative result for a step whose verification task failed.
    fn failed(step_id: String) -> Self {
        Self {
            step_id,
            symbolic_score: 0.0,
            heuristic_score: 0.0,
            confidence: 0.0,
            valid: false,
            equivalence: None,
            judge_score: None,
            coherence: None,
        }
    }
}

/// Verdict for a whole proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofVerdict {
    /// Per-step results in input order.
    pub steps: Vec<VerificationResult>,
    pub valid_count: usize,
    pub total_count: usize,
    /// Mean confidence x 100, rounded to 2 decimals; 100 for an empty proof.
    pub score: f64,
    /// `score` less `cycle_penalty` per dependency cycle, floored at 0.
    pub integrity: f64,
    /// Every step valid, `integrity >= pass_threshold` and no cycles.
    pub valid: bool,
    pub graph: GraphAnalysis,
}

/// Running counters across all verifications by one engine.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    steps_verified: AtomicU64,
    total_micros: AtomicU64,
}

/// Point-in-time copy of [`EngineMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub steps_verified: u64,
    pub total_ms: f64,
    pub avg_step_ms: f64,
}

impl EngineMetrics {
    fn record(&self, started: Instant) {
        let micros = started.elapsed().as_micros() as u64;
        self.steps_verified.fetch_add(1, Ordering::Relaxed);
        self.total_micros.fetch_add(micros, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let steps = self.steps_verified.load(Ordering::Relaxed);
        let total_ms = self.total_micros.load(Ordering::Relaxed) as f64 / 1000.0;
        MetricsSnapshot {
            steps_verified: steps,
            total_ms,
            avg_step_ms: if steps == 0 { 0.0 } else { total_ms / steps as f64 },
        }
    }

    pub fn reset(&self) {
        self.steps_verified.store(0, Ordering::Relaxed);
        self.total_micros.store(0, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Verifies proof steps by blending an equivalence check with heuristics.
///
/// Cheap to clone; clones share the checker, judge and metrics.
#[derive(Clone)]
pub struct HybridEngine {
    config: Arc<VerificationConfig>,
    consensus: Consensus,
    checker: Arc<dyn EquationChecker>,
    judge: Option<Arc<dyn SemanticJudge>>,
    metrics: Arc<EngineMetrics>,
}

impl HybridEngine {
    /// Validate `config` and build an engine around `checker`.
    pub fn new(
        config: VerificationConfig,
        checker: Arc<dyn EquationChecker>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            consensus: Consensus::from_config(&config),
            config: Arc::new(config),
            checker,
            judge: None,
            metrics: Arc::new(EngineMetrics::default()),
        })
    }

    /// Consult `judge` for every step.
    pub fn with_judge(mut self, judge: Arc<dyn SemanticJudge>) -> Self {
        self.judge = Some(judge);
        self
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    pub fn consensus(&self) -> &Consensus {
        &self.consensus
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Symbolic evidence for a step. Equations in symbolic domains go to
    /// the checker; every link must be equivalent. Without a verdict the
    /// structural score stands in as a soft signal.
    async fn symbolic_signal(
        &self,
        step: &ProofStep,
    ) -> (SymbolicSignal, Option<EquivalenceVerdict>) {
        let links = step.equation_links();
        if links.is_empty() || !self.config.symbolic_domains.contains(&step.domain) {
            return (SymbolicSignal::soft(structural_score(step)), None);
        }

        let mut verdict = EquivalenceVerdict::Equivalent;
        for (lhs, rhs) in &links {
            let link = self.checker.check(lhs, rhs).await;
            if !link.is_equivalent() {
                verdict = link;
                break;
            }
        }

        let signal = match &verdict {
            EquivalenceVerdict::Equivalent => SymbolicSignal::decided(true),
            EquivalenceVerdict::NotEquivalent => SymbolicSignal::decided(false),
            EquivalenceVerdict::Undecided { reason } => {
                tracing::debug!(step = %step.id, reason = %reason, "No symbolic verdict, using structural score");
                SymbolicSignal::soft(structural_score(step))
            }
        };
        (signal, Some(verdict))
    }

    /// Verify one step.
    ///
    /// Only a judge failure is an error; symbolic failures degrade to the
    /// structural score.
    pub async fn verify_step(&self, step: &ProofStep) -> Result<VerificationResult, JudgeError> {
        let started = Instant::now();

        let (signal, equivalence) = self.symbolic_signal(step).await;
        let plausibility = plausibility_score(step);

        let (judge_score, coherence) = match &self.judge {
            Some(judge) => {
                let verdict = judge.judge(step).await?;
                (Some(verdict.score), verdict.agreement.map(|a| a.coherence))
            }
            None => (None, None),
        };
        let heuristic = consensus::with_judge(plausibility, judge_score);

        let confidence = self.consensus.blend(signal, heuristic);
        let coherent = coherence.map_or(true, |c| c >= self.config.min_coherence);
        let valid = self.consensus.is_valid(confidence) && coherent;
        self.metrics.record(started);

        tracing::debug!(
            step = %step.id,
            symbolic = signal.score,
            decisive = signal.decisive,
            heuristic,
            confidence,
            coherence,
            valid,
            "Step verified"
        );

        Ok(VerificationResult {
            step_id: step.id.clone(),
            symbolic_score: signal.score,
            heuristic_score: heuristic,
            confidence,
            valid,
            equivalence,
            judge_score,
            coherence,
        })
    }

    /// Verify all steps concurrently; results keep the input order. The
    /// dependency graph is analysed alongside, and any cycle invalidates
    /// the proof.
    pub async fn verify_proof(&self, steps: &[ProofStep]) -> Result<ProofVerdict, JudgeError> {
        let mut tasks = JoinSet::new();
        for (index, step) in steps.iter().enumerate() {
            let engine = self.clone();
            let step = step.clone();
            tasks.spawn(async move { (index, engine.verify_step(&step).await) });
        }

        let mut slots: Vec<Option<VerificationResult>> = vec![None; steps.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(result))) => slots[index] = Some(result),
                Ok((_, Err(e))) => {
                    tasks.abort_all();
                    return Err(e);
                }
                Err(e) => tracing::warn!(error = %e, "Step verification task failed"),
            }
        }

        let results: Vec<VerificationResult> = slots
            .into_iter()
            .zip(steps)
            .map(|(slot, step)| slot.unwrap_or_else(|| VerificationResult::failed(step.id.clone())))
            .collect();
        Ok(self.summarize(results, graph::analyze(steps)))
    }

    fn summarize(&self, steps: Vec<VerificationResult>, graph: GraphAnalysis) -> ProofVerdict {
        let total_count = steps.len();
        let valid_count = steps.iter().filter(|r| r.valid).count();
        let score = if total_count == 0 {
            100.0
        } else {
            let mean = steps.iter().map(|r| r.confidence).sum::<f64>() / total_count as f64;
            (mean * 100.0 * 100.0).round() / 100.0
        };
        let penalty = self.config.cycle_penalty * graph.cycles.len() as f64;
        let integrity = (score - penalty).max(0.0);
        for message in graph.cycle_messages() {
            tracing::warn!("{message}");
        }
        let valid = valid_count == total_count
            && integrity >= self.config.pass_threshold
            && graph.is_acyclic();
        tracing::info!(
            valid_count,
            total_count,
            score,
            integrity,
            depth = graph.depth,
            cycles = graph.cycles.len(),
            valid,
            "Proof verified"
        );
        ProofVerdict {
            steps,
            valid_count,
            total_count,
            score,
            integrity,
            valid,
            graph,
        }
    }
}
