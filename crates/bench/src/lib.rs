//! Batch benchmark evaluation over a proof dataset.
//!
//! Scores every dataset item with the proof-text heuristic and a
//! deterministic semantic placeholder, aggregates the pass rate with its
//! Wilson lower bound, and writes JSON and CSV reports.

pub mod evaluator;
pub mod reader;
pub mod stats;
pub mod types;
pub mod writer;

pub use evaluator::{semantic_placeholder, BenchmarkConfig, BenchmarkEvaluator};
pub use reader::ReportReader;
pub use stats::{domain_breakdown, round_to, wilson_lower_bound, DomainStats, Z_95};
pub use types::{BenchmarkMeta, BenchmarkReport, Dataset, DatasetItem, ProofScore};
pub use writer::{ReportPaths, ReportWriter, CSV_HEADER};
