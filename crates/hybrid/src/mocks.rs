//! Seam implementations for testing without worker processes or providers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use symbolic::cas;
use symbolic::{EquivalenceVerdict, ProofStep};

use crate::engine::{EquationChecker, JudgeError, JudgeVerdict, SemanticJudge};

// ---------------------------------------------------------------------------
// MockChecker
// ---------------------------------------------------------------------------

/// Canned verdicts keyed by `(lhs, rhs)`, with a fallback for anything else.
pub struct MockChecker {
    verdicts: HashMap<(String, String), EquivalenceVerdict>,
    default: EquivalenceVerdict,
    calls: AtomicUsize,
}

impl MockChecker {
    /// Answer every check with `verdict`.
    pub fn always(verdict: EquivalenceVerdict) -> Self {
        Self {
            verdicts: HashMap::new(),
            default: verdict,
            calls: AtomicUsize::new(0),
        }
    }

    /// Canned verdict for one exact pair of sides.
    pub fn set(&mut self, lhs: &str, rhs: &str, verdict: EquivalenceVerdict) {
        self.verdicts
            .insert((lhs.to_string(), rhs.to_string()), verdict);
    }

    /// Number of checks answered so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EquationChecker for MockChecker {
    async fn check(&self, lhs: &str, rhs: &str) -> EquivalenceVerdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdicts
            .get(&(lhs.to_string(), rhs.to_string()))
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

// ---------------------------------------------------------------------------
// CasChecker
// ---------------------------------------------------------------------------

/// Runs the computer-algebra core on the calling task. Exact, but blocks
/// the caller for the duration of the check.
pub struct CasChecker;

#[async_trait]
impl EquationChecker for CasChecker {
    async fn check(&self, lhs: &str, rhs: &str) -> EquivalenceVerdict {
        match cas::equivalent_str(lhs, rhs) {
            Ok(true) => EquivalenceVerdict::Equivalent,
            Ok(false) => EquivalenceVerdict::NotEquivalent,
            Err(e) => EquivalenceVerdict::Undecided {
                reason: e.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// MockJudge
// ---------------------------------------------------------------------------

/// Judge with a fixed score, a fixed panel of model scores, or one whose
/// providers are all exhausted.
pub struct MockJudge {
    scores: Vec<u8>,
    panel: bool,
    calls: AtomicUsize,
}

impl MockJudge {
    pub fn scoring(score: u8) -> Self {
        Self {
            scores: vec![score.min(100)],
            panel: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Several models, one score each; the verdict carries their agreement.
    pub fn panel(scores: &[u8]) -> Self {
        Self {
            scores: scores.iter().map(|s| (*s).min(100)).collect(),
            panel: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn exhausted() -> Self {
        Self {
            scores: Vec::new(),
            panel: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SemanticJudge for MockJudge {
    async fn judge(&self, _step: &ProofStep) -> Result<JudgeVerdict, JudgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.scores.is_empty() {
            return Err(JudgeError::Chain(
                providers::ChainError::AllProvidersExhausted {
                    attempts: vec!["mock: exhausted".to_string()],
                },
            ));
        }
        if !self.panel {
            return Ok(JudgeVerdict {
                score: self.scores[0],
                reasoning: "mock".to_string(),
                source: "mock".to_string(),
                agreement: None,
            });
        }
        let scores: Vec<f64> = self.scores.iter().map(|&s| f64::from(s)).collect();
        let agreement = crate::consensus::agreement(&scores);
        Ok(JudgeVerdict {
            score: agreement.mean.clamp(0.0, 100.0) as u8,
            reasoning: "mock panel".to_string(),
            source: "mock".to_string(),
            agreement: Some(agreement),
        })
    }
}
