use serde::{Deserialize, Serialize};
use symbolic::Domain;

/// Rejected configuration value. Fatal at startup.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {field} = {value} (expected {expected})")]
    InvalidConfiguration {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
}

pub fn check_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidConfiguration {
            field,
            value,
            expected: "a value in [0, 1]",
        })
    }
}

pub fn check_percent(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidConfiguration {
            field,
            value,
            expected: "a value in [0, 100]",
        })
    }
}

/// Validate a pair of blend weights: each in [0, 1], not both zero.
/// A sum other than 1.0 only warns; blends are normalized by the sum.
pub fn check_weights(
    names: (&'static str, &'static str),
    weights: (f64, f64),
) -> Result<(), ConfigError> {
    check_unit(names.0, weights.0)?;
    check_unit(names.1, weights.1)?;
    let sum = weights.0 + weights.1;
    if sum <= 0.0 {
        return Err(ConfigError::InvalidConfiguration {
            field: names.0,
            value: weights.0,
            expected: "weights with a positive sum",
        });
    }
    if (sum - 1.0).abs() > 1e-6 {
        tracing::warn!(
            first = weights.0,
            second = weights.1,
            sum,
            "{} + {} = {sum:.4}, expected 1.0; blends will be normalized",
            names.0,
            names.1
        );
    }
    Ok(())
}

/// Step- and proof-level verification settings, loaded from the
/// `[verification]` TOML section. Every caller reads its weights and
/// thresholds from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Weight of the symbolic signal in the balanced blend.
    #[serde(default = "default_symbolic_weight")]
    pub symbolic_weight: f64,

    /// Weight of the heuristic signal in the balanced blend.
    #[serde(default = "default_heuristic_weight", alias = "semantic_weight")]
    pub heuristic_weight: f64,

    /// Minimum consensus confidence for a step to be valid.
    #[serde(default = "default_step_pass_threshold")]
    pub step_pass_threshold: f64,

    /// Minimum proof score (0-100) for a whole proof to be valid.
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,

    /// Shift weight toward the symbolic signal when it is decisive.
    #[serde(default = "default_adaptive")]
    pub adaptive: bool,

    /// Symbolic weight used when the equivalence engine reached a verdict.
    #[serde(default = "default_decisive_symbolic_weight")]
    pub decisive_symbolic_weight: f64,

    /// Domains whose equations are sent to the equivalence engine. Other
    /// domains use the structural heuristic as their symbolic signal.
    #[serde(default = "default_symbolic_domains")]
    pub symbolic_domains: Vec<Domain>,

    /// Points taken off the proof score for each dependency cycle.
    #[serde(default = "default_cycle_penalty")]
    pub cycle_penalty: f64,

    /// Minimum judge coherence (0-100) for a step to be valid when several
    /// models scored it.
    #[serde(default = "default_min_coherence")]
    pub min_coherence: f64,
}

fn default_symbolic_weight() -> f64 {
    0.6
}
fn default_heuristic_weight() -> f64 {
    0.4
}
fn default_step_pass_threshold() -> f64 {
    0.75
}
fn default_pass_threshold() -> f64 {
    70.0
}
fn default_adaptive() -> bool {
    true
}
fn default_decisive_symbolic_weight() -> f64 {
    0.9
}
fn default_symbolic_domains() -> Vec<Domain> {
    vec![Domain::Algebra]
}
fn default_cycle_penalty() -> f64 {
    15.0
}
fn default_min_coherence() -> f64 {
    70.0
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            symbolic_weight: default_symbolic_weight(),
            heuristic_weight: default_heuristic_weight(),
            step_pass_threshold: default_step_pass_threshold(),
            pass_threshold: default_pass_threshold(),
            adaptive: default_adaptive(),
            decisive_symbolic_weight: default_decisive_symbolic_weight(),
            symbolic_domains: default_symbolic_domains(),
            cycle_penalty: default_cycle_penalty(),
            min_coherence: default_min_coherence(),
        }
    }
}

impl VerificationConfig {
    /// Reject out-of-range weights and thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_weights(
            ("symbolic_weight", "heuristic_weight"),
            (self.symbolic_weight, self.heuristic_weight),
        )?;
        check_unit("step_pass_threshold", self.step_pass_threshold)?;
        check_percent("pass_threshold", self.pass_threshold)?;
        check_unit("decisive_symbolic_weight", self.decisive_symbolic_weight)?;
        check_percent("cycle_penalty", self.cycle_penalty)?;
        check_percent("min_coherence", self.min_coherence)?;
        Ok(())
    }
}
