//! Aggregate statistics: Wilson bound, rounding and per-domain pass rates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::ProofScore;

/// Normal quantile for a two-sided 95% interval.
pub const Z_95: f64 = 1.96;

/// Lower bound of the Wilson score interval for `successes / trials`.
///
/// Returns 0.0 when `trials == 0`.
pub fn wilson_lower_bound(successes: usize, trials: usize, z: f64) -> f64 {
    if trials == 0 {
        return 0.0;
    }
    let n = trials as f64;
    let p_hat = successes as f64 / n;
    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let center = p_hat + z2 / (2.0 * n);
    let adj = z * (p_hat * (1.0 - p_hat) / n + z2 / (4.0 * n * n)).sqrt();
    ((center - adj) / denom).max(0.0)
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Pass counts for one domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainStats {
    pub n: usize,
    pub passed: usize,
    pub pass_rate: f64,
}

/// Pass rate per domain, keyed and sorted by domain name.
pub fn domain_breakdown(items: &[ProofScore]) -> BTreeMap<String, DomainStats> {
    let mut counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for item in items {
        let entry = counts.entry(item.domain.clone()).or_default();
        entry.0 += 1;
        if item.passed {
            entry.1 += 1;
        }
    }
    counts
        .into_iter()
        .map(|(domain, (n, passed))| {
            let stats = DomainStats {
                n,
                passed,
                pass_rate: round_to(passed as f64 / n as f64, 4),
            };
            (domain, stats)
        })
        .collect()
}
