//! TOML config loading for the proofcore CLI.
//!
//! Deserializes `configs/proofcore.toml` which has `[verification]`,
//! `[benchmark]`, `[symbolic_pool]` and `[providers]` sections, then merges
//! with CLI overrides.

use std::path::{Path, PathBuf};

use bench::BenchmarkConfig;
use hybrid::VerificationConfig;
use providers::ProvidersConfig;
use serde::Deserialize;
use symbolic::SymbolicPoolConfig;

/// Used when `--config` is not given and this file exists.
pub const DEFAULT_CONFIG_PATH: &str = "configs/proofcore.toml";

/// Top-level structure matching `configs/proofcore.toml`. Every section is
/// optional.
#[derive(Debug, Default, Deserialize)]
pub struct ProofcoreToml {
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
    #[serde(default)]
    pub symbolic_pool: SymbolicPoolOverrides,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl ProofcoreToml {
    /// Reject out-of-range weights and thresholds. Called once at startup.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.verification.validate()?;
        self.benchmark.validate()?;
        Ok(())
    }
}

/// Optional overrides for `SymbolicPoolConfig` fields.
#[derive(Debug, Default, Deserialize)]
pub struct SymbolicPoolOverrides {
    pub num_workers: Option<usize>,
    pub max_requests_per_worker: Option<u64>,
    pub max_lifetime_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub worker_path: Option<PathBuf>,
}

/// Load a config file. An explicit path must exist; without one, the
/// default path is used if present and built-in defaults otherwise.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ProofcoreToml> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !default.is_file() {
                tracing::debug!("No config file, using built-in defaults");
                let config = ProofcoreToml::default();
                config.validate()?;
                return Ok(config);
            }
            default
        }
    };

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
    let config: ProofcoreToml = toml::from_str(&contents)?;
    config.validate()?;
    tracing::info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Build a `SymbolicPoolConfig` from defaults, TOML overrides, and CLI flags.
///
/// Priority chain: built-in defaults < TOML values < CLI `--num-workers`.
pub fn build_pool_config(
    overrides: &SymbolicPoolOverrides,
    num_workers_cli: Option<usize>,
) -> SymbolicPoolConfig {
    let mut config = SymbolicPoolConfig::default();

    if let Some(n) = overrides.num_workers {
        config.num_workers = n;
    }
    if let Some(n) = overrides.max_requests_per_worker {
        config.max_requests_per_worker = n;
    }
    if let Some(n) = overrides.max_lifetime_secs {
        config.max_lifetime_secs = n;
    }
    if let Some(n) = overrides.timeout_secs {
        config.timeout_secs = n;
    }
    if let Some(path) = &overrides.worker_path {
        config.worker_path = Some(path.clone());
    }

    if let Some(n) = num_workers_cli {
        config.num_workers = n;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_toml() {
        let toml_str = r#"
[verification]
symbolic_weight = 0.5
semantic_weight = 0.5
pass_threshold = 60.0

[benchmark]
pass_bar = 75.0

[symbolic_pool]
num_workers = 8
timeout_secs = 3

[providers]
order = ["google", "anthropic"]
max_retries = 1
"#;
        let config: ProofcoreToml = toml::from_str(toml_str).unwrap();
        assert!((config.verification.heuristic_weight - 0.5).abs() < 1e-9);
        assert!((config.verification.pass_threshold - 60.0).abs() < 1e-9);
        assert!((config.benchmark.pass_bar - 75.0).abs() < 1e-9);
        assert!((config.benchmark.symbolic_weight - 0.7).abs() < 1e-9);
        assert_eq!(config.symbolic_pool.num_workers, Some(8));
        assert_eq!(config.symbolic_pool.timeout_secs, Some(3));
        assert_eq!(config.providers.order.len(), 2);
        assert_eq!(config.providers.max_retries, 1);
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: ProofcoreToml = toml::from_str("").unwrap();
        assert!((config.verification.step_pass_threshold - 0.75).abs() < 1e-9);
        assert!((config.benchmark.pass_bar - 80.0).abs() < 1e-9);
        assert!(config.symbolic_pool.num_workers.is_none());
        assert_eq!(config.providers.timeout_secs, 30);
    }

    #[test]
    fn test_invalid_weight_fails_validation() {
        let config: ProofcoreToml = toml::from_str("[verification]\nsymbolic_weight = 1.4\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("symbolic_weight"), "{err}");

        let config: ProofcoreToml = toml::from_str("[benchmark]\npass_bar = -1.0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_override_priority() {
        let overrides = SymbolicPoolOverrides {
            num_workers: Some(8),
            timeout_secs: Some(2),
            ..Default::default()
        };
        let config = build_pool_config(&overrides, Some(2));
        assert_eq!(config.num_workers, 2);
        assert_eq!(config.timeout_secs, 2);
        assert_eq!(config.max_requests_per_worker, 1000);

        let config = build_pool_config(&overrides, None);
        assert_eq!(config.num_workers, 8);
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(load_config(Some(&tmp.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_load_repo_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../configs/proofcore.toml");
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.symbolic_pool.num_workers, Some(4));
        assert_eq!(config.providers.order.len(), 3);
    }
}
