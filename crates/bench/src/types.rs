//! Dataset items, per-item scores and the aggregate report.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One benchmark problem with its reference proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetItem {
    pub id: String,
    #[serde(default = "unknown_domain")]
    pub domain: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub expected_validity: bool,
    /// Free-text proof. Also read from `correct_proof`.
    #[serde(alias = "correct_proof")]
    pub proof_text: String,
    /// Problem statement. Also read from `problem`.
    #[serde(default, alias = "problem")]
    pub problem_text: String,
}

fn unknown_domain() -> String {
    "unknown".to_string()
}

impl DatasetItem {
    /// Stand-in for an element that could not be read. It carries no
    /// text, so it scores low but still gets its own record.
    pub fn placeholder(id: String) -> Self {
        Self {
            id,
            domain: unknown_domain(),
            difficulty: String::new(),
            expected_validity: false,
            proof_text: String::new(),
            problem_text: String::new(),
        }
    }
}

/// An ordered benchmark dataset.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub items: Vec<DatasetItem>,
    /// Elements replaced by placeholders.
    pub malformed: usize,
}

impl Dataset {
    /// Parse a JSON array of items. Only a non-array document is an
    /// error; a bad element becomes a placeholder.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).context("dataset is not valid JSON")?;
        let serde_json::Value::Array(elements) = value else {
            anyhow::bail!("dataset must be a JSON array of items");
        };

        let mut dataset = Dataset::default();
        for (index, element) in elements.into_iter().enumerate() {
            let fallback_id = element_id(&element).unwrap_or_else(|| format!("item-{index}"));
            match serde_json::from_value::<DatasetItem>(element) {
                Ok(item) => dataset.items.push(item),
                Err(e) => {
                    tracing::warn!(index, id = %fallback_id, error = %e, "Malformed dataset item, scoring placeholder");
                    dataset.malformed += 1;
                    dataset.items.push(DatasetItem::placeholder(fallback_id));
                }
            }
        }
        Ok(dataset)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dataset {}", path.display()))?;
        let dataset = Self::from_json(&text)?;
        tracing::info!(
            items = dataset.items.len(),
            malformed = dataset.malformed,
            path = %path.display(),
            "Loaded dataset"
        );
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn element_id(element: &serde_json::Value) -> Option<String> {
    match element.get("id")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Benchmark result for one dataset item. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofScore {
    pub id: String,
    pub domain: String,
    pub difficulty: String,
    pub expected_validity: bool,
    pub symbolic_score: f64,
    pub semantic_score: f64,
    pub hybrid_score: f64,
    pub confidence_low: f64,
    pub confidence_high: f64,
    pub passed: bool,
}

/// Aggregate statistics over one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkMeta {
    pub n: usize,
    pub passed: usize,
    pub failed: usize,
    pub accuracy: f64,
    /// Wilson 95% lower bound on `accuracy`.
    pub accuracy_ci95_low: f64,
    pub avg_symbolic: f64,
    pub avg_semantic: f64,
    pub avg_hybrid: f64,
    /// The semantic signal is the hash placeholder, not a model call.
    pub offline: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub meta: BenchmarkMeta,
    pub items: Vec<ProofScore>,
}
