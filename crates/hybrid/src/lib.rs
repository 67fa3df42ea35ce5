//! Heuristic evaluation and consensus scoring of proof steps.
//!
//! Combines the symbolic equivalence engine with deterministic text
//! heuristics and an optional language-model judge. Trait seams keep the
//! scoring logic testable without worker processes or network access.
//!
//! # Key types
//!
//! - [`HybridEngine`]: per-step and per-proof verification
//! - [`VerificationConfig`]: weights and thresholds loaded from TOML
//! - [`Consensus`]: adaptive weighted blend of symbolic and heuristic evidence
//! - [`GraphAnalysis`]: circular reasoning and depth of the step dependency graph
//! - [`EquationChecker`] / [`SemanticJudge`]: traits for the symbolic and judge signals

pub mod adapters;
pub mod config;
pub mod consensus;
pub mod engine;
pub mod graph;
pub mod heuristic;
pub mod mocks;

pub use adapters::{ChainJudge, OfflineJudge};
pub use config::{check_percent, check_unit, check_weights, ConfigError, VerificationConfig};
pub use consensus::{agreement, with_judge, Consensus, ModelAgreement, SymbolicSignal};
pub use engine::{
    EngineMetrics, EquationChecker, HybridEngine, JudgeError, JudgeVerdict, MetricsSnapshot,
    ProofVerdict, SemanticJudge, VerificationResult,
};
pub use graph::{analyze, DanglingReference, GraphAnalysis, BOTTLENECK_IN_DEGREE};
pub use heuristic::{claim_score, plausibility_score, proof_text_score, structural_score};
