use serde::{Deserialize, Serialize};

use crate::config::VerificationConfig;

/// Symbolic evidence for one step together with whether it came from a
/// definite equivalence verdict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolicSignal {
    /// In [0, 1].
    pub score: f64,
    pub decisive: bool,
}

impl SymbolicSignal {
    /// A definite verdict from the equivalence engine: 1.0 or 0.0.
    pub fn decided(equivalent: bool) -> Self {
        Self {
            score: if equivalent { 1.0 } else { 0.0 },
            decisive: true,
        }
    }

    /// A soft substitute (structural score) used when no verdict exists.
    pub fn soft(score: f64) -> Self {
        Self {
            score,
            decisive: false,
        }
    }

    /// Decisive iff the value is exactly 0 or 1.
    pub fn from_value(score: f64) -> Self {
        Self {
            score,
            decisive: score == 0.0 || score == 1.0,
        }
    }
}

/// Weighted blend of symbolic and heuristic evidence into one confidence.
#[derive(Debug, Clone)]
pub struct Consensus {
    symbolic_weight: f64,
    heuristic_weight: f64,
    decisive_symbolic_weight: f64,
    adaptive: bool,
    step_pass_threshold: f64,
}

impl Consensus {
    pub fn from_config(config: &VerificationConfig) -> Self {
        Self {
            symbolic_weight: config.symbolic_weight,
            heuristic_weight: config.heuristic_weight,
            decisive_symbolic_weight: config.decisive_symbolic_weight,
            adaptive: config.adaptive,
            step_pass_threshold: config.step_pass_threshold,
        }
    }

    /// `(ws * symbolic + wh * heuristic) / (ws + wh)`, clamped to [0, 1].
    pub fn fixed_blend(&self, symbolic: f64, heuristic: f64) -> f64 {
        let total = self.symbolic_weight + self.heuristic_weight;
        if total <= 0.0 {
            return 0.0;
        }
        ((self.symbolic_weight * symbolic + self.heuristic_weight * heuristic) / total)
            .clamp(0.0, 1.0)
    }

    /// Blend with adaptive weighting: a decisive symbolic signal gets
    /// `decisive_symbolic_weight`, the heuristic the remainder.
    pub fn blend(&self, signal: SymbolicSignal, heuristic: f64) -> f64 {
        if self.adaptive && signal.decisive {
            let w = self.decisive_symbolic_weight;
            (w * signal.score + (1.0 - w) * heuristic).clamp(0.0, 1.0)
        } else {
            self.fixed_blend(signal.score, heuristic)
        }
    }

    /// Value-based blend: a symbolic value of exactly 0 or 1 counts as decisive.
    pub fn consensus(&self, symbolic: f64, heuristic: f64) -> f64 {
        self.blend(SymbolicSignal::from_value(symbolic), heuristic)
    }

    /// Whether a confidence clears the step threshold (inclusive).
    pub fn is_valid(&self, confidence: f64) -> bool {
        confidence >= self.step_pass_threshold
    }

    pub fn step_pass_threshold(&self) -> f64 {
        self.step_pass_threshold
    }
}

/// Fold an external judge score (0..=100) into the heuristic signal as
/// the mean of both.
pub fn with_judge(heuristic: f64, judge_score: Option<u8>) -> f64 {
    match judge_score {
        Some(score) => ((heuristic + f64::from(score) / 100.0) / 2.0).clamp(0.0, 1.0),
        None => heuristic,
    }
}

/// Agreement among several scores on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelAgreement {
    /// Mean, rounded to an integer.
    pub mean: f64,
    /// Population variance, rounded to one decimal.
    pub variance: f64,
    /// `max(0, 100 - variance)`, rounded to an integer.
    pub coherence: f64,
}

/// Mean, variance and coherence of a set of 0-100 scores. An empty set
/// has no disagreement: mean 0, variance 0, coherence 100.
pub fn agreement(scores: &[f64]) -> ModelAgreement {
    if scores.is_empty() {
        return ModelAgreement {
            mean: 0.0,
            variance: 0.0,
            coherence: 100.0,
        };
    }
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    ModelAgreement {
        mean: mean.round(),
        variance: (variance * 10.0).round() / 10.0,
        coherence: (100.0 - variance).max(0.0).round(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consensus() -> Consensus {
        Consensus::from_config(&VerificationConfig::default())
    }

    #[test]
    fn test_fixed_blend_default_weights() {
        let c = consensus();
        assert!((c.fixed_blend(1.0, 0.5) - 0.8).abs() < 1e-9);
        assert!((c.fixed_blend(0.5, 0.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_blend_normalizes_weights() {
        let c = Consensus::from_config(&VerificationConfig {
            symbolic_weight: 0.3,
            heuristic_weight: 0.1,
            ..Default::default()
        });
        assert!((c.fixed_blend(1.0, 0.0) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_decisive_signal_shifts_weight() {
        let c = consensus();
        let confidence = c.blend(SymbolicSignal::decided(true), 0.7);
        assert!((confidence - 0.97).abs() < 1e-9);
        let rejected = c.blend(SymbolicSignal::decided(false), 1.0);
        assert!((rejected - 0.1).abs() < 1e-9);
        assert!(!c.is_valid(rejected));
    }

    #[test]
    fn test_soft_signal_uses_fixed_weights() {
        let c = consensus();
        let confidence = c.blend(SymbolicSignal::soft(0.4), 0.5);
        assert!((confidence - 0.44).abs() < 1e-9);
    }

    #[test]
    fn test_non_adaptive_ignores_decisiveness() {
        let c = Consensus::from_config(&VerificationConfig {
            adaptive: false,
            ..Default::default()
        });
        assert!((c.consensus(1.0, 0.5) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_value_based_decisiveness() {
        let c = consensus();
        assert!((c.consensus(1.0, 0.5) - 0.95).abs() < 1e-9);
        assert!((c.consensus(0.5, 0.5) - 0.5).abs() < 1e-9);
        assert!(SymbolicSignal::from_value(0.0).decisive);
        assert!(!SymbolicSignal::from_value(0.99).decisive);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let c = consensus();
        assert!(c.is_valid(0.75));
        assert!(!c.is_valid(0.7499));
    }

    #[test]
    fn test_judge_averaged_into_heuristic() {
        assert!((with_judge(0.6, Some(80)) - 0.7).abs() < 1e-9);
        assert!((with_judge(0.6, None) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_agreement_statistics() {
        let a = agreement(&[70.0, 80.0, 90.0]);
        assert_eq!(a.mean, 80.0);
        assert!((a.variance - 66.7).abs() < 1e-9);
        assert_eq!(a.coherence, 33.0);
    }

    #[test]
    fn test_agreement_single_and_empty() {
        let single = agreement(&[75.0]);
        assert_eq!(single.mean, 75.0);
        assert_eq!(single.variance, 0.0);
        assert_eq!(single.coherence, 100.0);
        assert_eq!(agreement(&[]).coherence, 100.0);
    }

    #[test]
    fn test_agreement_coherence_floors_at_zero() {
        let a = agreement(&[0.0, 100.0]);
        assert_eq!(a.variance, 2500.0);
        assert_eq!(a.coherence, 0.0);
    }
}
