use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::cas::{self, Expr};
use crate::pool::SymbolicPool;
use crate::protocol::{WorkerCommand, WorkerReply};
use crate::types::{ProofStep, SymbolicError};

/// Outcome of one equivalence check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum EquivalenceVerdict {
    /// `lhs - rhs` simplified to zero.
    Equivalent,
    /// Simplification finished with a nonzero difference.
    NotEquivalent,
    /// Parse failure, unsupported construct, timeout or worker failure.
    Undecided { reason: String },
}

impl EquivalenceVerdict {
    pub fn is_equivalent(&self) -> bool {
        matches!(self, EquivalenceVerdict::Equivalent)
    }

    /// Whether the engine reached a definite answer either way.
    pub fn is_decisive(&self) -> bool {
        !matches!(self, EquivalenceVerdict::Undecided { .. })
    }
}

/// A successfully parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExpr {
    pub source: String,
    pub expr: Expr,
    /// Free symbols, sorted.
    pub symbols: Vec<String>,
}

/// Per-step entry of a [`StepsReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCheck {
    pub step_id: String,
    pub step_index: usize,
    pub symbolically_valid: bool,
}

/// Result of [`SymbolicVerifier::verify_steps`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepsReport {
    /// `100 * valid_count / total_count`, rounded to 2 decimals; 100 for no steps.
    pub score: f64,
    pub valid_count: usize,
    pub total_count: usize,
    pub details: Vec<StepCheck>,
}

/// Symbolic equivalence checks executed on a [`SymbolicPool`].
///
/// Every failure mode degrades to "not proven equal": callers get a
/// `false` or an [`EquivalenceVerdict::Undecided`], never an error.
#[derive(Clone)]
pub struct SymbolicVerifier {
    pool: Arc<SymbolicPool>,
}

impl SymbolicVerifier {
    pub fn new(pool: Arc<SymbolicPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Arc<SymbolicPool> {
        &self.pool
    }

    /// Check `lhs == rhs` on a pool worker.
    pub async fn check_equation(&self, lhs: &str, rhs: &str) -> EquivalenceVerdict {
        check_on(&self.pool, lhs, rhs).await
    }

    /// `true` iff `lhs - rhs` simplifies to exactly zero.
    pub async fn verify_equation(&self, lhs: &str, rhs: &str) -> bool {
        self.check_equation(lhs, rhs).await.is_equivalent()
    }

    /// Check every step's equation. Steps without an equality claim are
    /// vacuously valid; an empty list scores 100.
    pub async fn verify_steps(&self, steps: &[ProofStep]) -> StepsReport {
        let mut tasks = JoinSet::new();
        for (index, step) in steps.iter().enumerate() {
            let pool = Arc::clone(&self.pool);
            let links = step.equation_links();
            tasks.spawn(async move {
                for (lhs, rhs) in &links {
                    if !check_on(&pool, lhs, rhs).await.is_equivalent() {
                        return (index, false);
                    }
                }
                (index, true)
            });
        }

        let mut valid = vec![false; steps.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, ok)) => valid[index] = ok,
                Err(e) => tracing::warn!(error = %e, "Step verification task failed"),
            }
        }

        let details: Vec<StepCheck> = steps
            .iter()
            .zip(&valid)
            .enumerate()
            .map(|(step_index, (step, &ok))| StepCheck {
                step_id: step.id.clone(),
                step_index,
                symbolically_valid: ok,
            })
            .collect();
        let valid_count = valid.iter().filter(|&&ok| ok).count();
        let total_count = steps.len();
        let score = if total_count == 0 {
            100.0
        } else {
            (valid_count as f64 / total_count as f64 * 100.0 * 100.0).round() / 100.0
        };

        StepsReport {
            score,
            valid_count,
            total_count,
            details,
        }
    }

    /// Parse `expr` in-process; `None` on any parse error.
    pub fn parse_and_validate(&self, expr: &str) -> Option<ParsedExpr> {
        parse_expression(expr)
    }

    /// Canonical simplified form computed on a pool worker; `None` on any failure.
    pub async fn simplify_expression(&self, expr: &str) -> Option<String> {
        let command = WorkerCommand::Simplify {
            expr: expr.to_string(),
        };
        match self.pool.submit(&command).await {
            Ok(WorkerReply::Simplified(text)) => Some(text),
            Ok(WorkerReply::Fault(fault)) => {
                tracing::debug!(expr, error = %fault.error, desc = %fault.desc, "Simplification failed");
                None
            }
            Ok(other) => {
                tracing::warn!(?other, "Unexpected reply to simplify");
                None
            }
            Err(e) => {
                tracing::warn!(expr, error = %e, "Symbolic pool failure during simplify");
                None
            }
        }
    }

    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

/// Parse without a pool. Parsing is linear in the input, so it stays
/// on the caller's thread.
pub fn parse_expression(expr: &str) -> Option<ParsedExpr> {
    match cas::parse(expr) {
        Ok(parsed) => {
            let mut symbols = parsed.symbols();
            symbols.sort();
            Some(ParsedExpr {
                source: expr.to_string(),
                expr: parsed,
                symbols,
            })
        }
        Err(e) => {
            tracing::debug!(expr, error = %e, "Expression failed to parse");
            None
        }
    }
}

async fn check_on(pool: &SymbolicPool, lhs: &str, rhs: &str) -> EquivalenceVerdict {
    let command = WorkerCommand::Verify {
        lhs: lhs.to_string(),
        rhs: rhs.to_string(),
    };
    match pool.submit(&command).await {
        Ok(WorkerReply::Verified(true)) => EquivalenceVerdict::Equivalent,
        Ok(WorkerReply::Verified(false)) => EquivalenceVerdict::NotEquivalent,
        Ok(WorkerReply::Fault(fault)) => {
            tracing::debug!(lhs, rhs, error = %fault.error, desc = %fault.desc, "Equation not checkable");
            EquivalenceVerdict::Undecided {
                reason: format!("{}: {}", fault.error, fault.desc),
            }
        }
        Ok(other) => EquivalenceVerdict::Undecided {
            reason: format!("unexpected reply {other:?}"),
        },
        Err(e) => {
            if matches!(e, SymbolicError::Timeout(_)) {
                tracing::warn!(lhs, rhs, error = %e, "Equivalence check timed out");
            } else {
                tracing::warn!(lhs, rhs, error = %e, "Symbolic pool failure");
            }
            EquivalenceVerdict::Undecided {
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_validate_collects_sorted_symbols() {
        let parsed = parse_expression("y*x + 2z").unwrap();
        assert_eq!(parsed.symbols, vec!["x", "y", "z"]);
        assert_eq!(parsed.source, "y*x + 2z");
    }

    #[test]
    fn parse_and_validate_returns_none_on_error() {
        assert!(parse_expression("((").is_none());
        assert!(parse_expression("").is_none());
    }

    #[test]
    fn parse_and_validate_returns_none_for_long_flat_sum() {
        let sum = format!("{}x", "x+".repeat(200_000));
        assert!(parse_expression(&sum).is_none());
        let sum = format!("{}x", "x+".repeat(1_500));
        assert!(parse_expression(&sum).is_none());
    }

    #[test]
    fn verdict_serializes_with_tag() {
        let v = EquivalenceVerdict::Undecided {
            reason: "parse".into(),
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["verdict"], "undecided");
        assert_eq!(json["reason"], "parse");
        assert!(!v.is_decisive());
        assert!(EquivalenceVerdict::NotEquivalent.is_decisive());
    }
}
