//! Input document and output shapes for the CLI.

use std::path::Path;

use hybrid::{MetricsSnapshot, ModelAgreement, ProofVerdict};
use providers::{CostStats, ProviderHealth, ProviderResponse};
use serde::{Deserialize, Serialize};
use symbolic::ProofStep;

/// A proof submitted to `verify`: a name and ordered steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofDocument {
    #[serde(default)]
    pub name: String,
    pub steps: Vec<ProofStep>,
}

impl ProofDocument {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read proof {}: {e}", path.display()))?;
        let doc: ProofDocument = serde_json::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("malformed proof {}: {e}", path.display()))?;
        Ok(doc)
    }
}

/// Output of `verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOutput {
    pub name: String,
    #[serde(flatten)]
    pub verdict: ProofVerdict,
    pub metrics: MetricsSnapshot,
    /// Provider spend when `--judge` was used.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub costs: Vec<CostStats>,
}

/// Output of `judge`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeOutput {
    pub responses: Vec<ProviderResponse>,
    pub agreement: ModelAgreement,
    pub costs: Vec<CostStats>,
    pub total_cost: f64,
    /// Standing of each provider after the call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<ProviderHealth>,
}
