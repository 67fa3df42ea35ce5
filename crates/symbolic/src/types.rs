use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Errors that can occur while talking to symbolic worker processes.
#[derive(Debug, thiserror::Error)]
pub enum SymbolicError {
    /// Worker process exited unexpectedly.
    #[error("symbolic worker exited unexpectedly")]
    ProcessDied,

    /// A request did not complete within the configured number of seconds.
    #[error("symbolic request timed out after {0}s")]
    Timeout(u64),

    /// Malformed JSON or an unexpected reply shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No `symbolic-worker` executable could be located.
    #[error("symbolic-worker binary not found (set SYMBOLIC_WORKER_PATH)")]
    WorkerNotFound,

    /// IO error from process communication.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Mathematical domain a proof step belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    #[default]
    Algebra,
    Geometry,
    Logic,
}

/// The equation a proof step asserts, either as one string or as
/// explicit sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Equation {
    Sides { lhs: String, rhs: String },
    Text(String),
}

impl Equation {
    /// Adjacent equal pairs this equation claims.
    ///
    /// `a = b = c` yields `(a, b)` and `(b, c)`. Inequalities, empty sides
    /// and text without `=` claim nothing and yield an empty list.
    pub fn links(&self) -> Vec<(String, String)> {
        match self {
            Equation::Sides { lhs, rhs } => {
                let (lhs, rhs) = (lhs.trim(), rhs.trim());
                if lhs.is_empty() || rhs.is_empty() {
                    Vec::new()
                } else {
                    vec![(lhs.to_string(), rhs.to_string())]
                }
            }
            Equation::Text(text) => {
                const NOT_EQUALITY: &[&str] = &["<", ">", "!=", "≤", "≥", "≠"];
                if NOT_EQUALITY.iter().any(|op| text.contains(op)) {
                    return Vec::new();
                }
                let normalized = text.replace("==", "=");
                let sides: Vec<&str> = normalized.split('=').map(str::trim).collect();
                if sides.len() < 2 || sides.iter().any(|s| s.is_empty()) {
                    return Vec::new();
                }
                sides
                    .windows(2)
                    .map(|pair| (pair[0].to_string(), pair[1].to_string()))
                    .collect()
            }
        }
    }

    /// The equation as display text.
    pub fn as_text(&self) -> String {
        match self {
            Equation::Sides { lhs, rhs } => format!("{lhs} = {rhs}"),
            Equation::Text(text) => text.clone(),
        }
    }
}

/// One step of a proof as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofStep {
    #[serde(alias = "step_id")]
    pub id: String,
    #[serde(default)]
    pub claim: String,
    #[serde(default)]
    pub equation: Option<Equation>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub domain: Domain,
    /// Ids of the steps this one is derived from.
    #[serde(default, alias = "depends_on", skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl ProofStep {
    pub fn new(id: impl Into<String>, equation: Option<Equation>) -> Self {
        Self {
            id: id.into(),
            claim: String::new(),
            equation,
            reasoning: String::new(),
            domain: Domain::default(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_claim(mut self, claim: impl Into<String>) -> Self {
        self.claim = claim.into();
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Equality links to check; empty when the step has no symbolic claim.
    pub fn equation_links(&self) -> Vec<(String, String)> {
        self.equation.as_ref().map(Equation::links).unwrap_or_default()
    }
}

/// Configuration for the symbolic worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolicPoolConfig {
    /// Number of worker processes to maintain.
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    /// Maximum requests before a worker is recycled.
    #[serde(default = "default_max_requests")]
    pub max_requests_per_worker: u64,

    /// Maximum lifetime in seconds before a worker is recycled.
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,

    /// Timeout in seconds for a single request.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Explicit path to the `symbolic-worker` executable. Discovered when unset.
    #[serde(default)]
    pub worker_path: Option<PathBuf>,
}

impl Default for SymbolicPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: default_num_workers(),
            max_requests_per_worker: default_max_requests(),
            max_lifetime_secs: default_max_lifetime(),
            timeout_secs: default_timeout(),
            worker_path: None,
        }
    }
}

impl SymbolicPoolConfig {
    /// The worker executable to launch: the explicit path if set,
    /// otherwise [`discover_worker()`].
    pub fn resolve_worker(&self) -> Result<PathBuf, SymbolicError> {
        self.worker_path
            .clone()
            .or_else(discover_worker)
            .ok_or(SymbolicError::WorkerNotFound)
    }
}

/// Locate the `symbolic-worker` executable.
///
/// Discovery chain (first match wins):
/// 1. `SYMBOLIC_WORKER_PATH` environment variable
/// 2. next to the running executable
/// 3. one directory up (test binaries live in `target/<profile>/deps/`)
pub fn discover_worker() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("SYMBOLIC_WORKER_PATH") {
        let p = PathBuf::from(path);
        if p.is_file() {
            return Some(p);
        }
        tracing::warn!(
            "SYMBOLIC_WORKER_PATH={} set but no file exists there",
            p.display()
        );
    }

    let name = format!("symbolic-worker{}", std::env::consts::EXE_SUFFIX);
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?;
    let found = [Some(dir), dir.parent()]
        .into_iter()
        .flatten()
        .map(|d| d.join(&name))
        .find(|candidate| candidate.is_file());
    found
}

fn default_num_workers() -> usize {
    4
}
fn default_max_requests() -> u64 {
    1000
}
fn default_max_lifetime() -> u64 {
    1800
}
fn default_timeout() -> u64 {
    10
}
