use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::pricing;
use crate::types::Usage;

#[derive(Debug, Default)]
struct Ledger {
    call_count: u64,
    total_cost: f64,
}

/// Snapshot of a [`CostTracker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostStats {
    pub provider: String,
    pub call_count: u64,
    pub total_cost: f64,
    /// `total_cost / call_count`, 0.0 before the first call.
    pub average_cost: f64,
}

/// Running cost ledger of one provider.
///
/// Share it through `Arc`; both counters are updated under a single lock.
#[derive(Debug)]
pub struct CostTracker {
    provider: String,
    ledger: Mutex<Ledger>,
}

impl CostTracker {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Price one call and record it. Unknown models cost 0.0 but still count.
    pub fn calculate(&self, model: &str, usage: &Usage) -> f64 {
        let cost = match pricing::lookup(&self.provider, model) {
            Some(p) => {
                usage.prompt_tokens as f64 / 1000.0 * p.prompt_per_1k
                    + usage.completion_tokens as f64 / 1000.0 * p.completion_per_1k
            }
            None => {
                tracing::debug!(provider = %self.provider, model, "No price for model, recording zero cost");
                0.0
            }
        };

        let mut ledger = self.ledger();
        ledger.call_count += 1;
        ledger.total_cost += cost;
        cost
    }

    pub fn call_count(&self) -> u64 {
        self.ledger().call_count
    }

    pub fn total_cost(&self) -> f64 {
        self.ledger().total_cost
    }

    pub fn stats(&self) -> CostStats {
        let ledger = self.ledger();
        let average_cost = if ledger.call_count == 0 {
            0.0
        } else {
            ledger.total_cost / ledger.call_count as f64
        };
        CostStats {
            provider: self.provider.clone(),
            call_count: ledger.call_count,
            total_cost: ledger.total_cost,
            average_cost,
        }
    }

    /// Zero both counters.
    pub fn reset(&self) {
        *self.ledger() = Ledger::default();
    }
}
