//! Reads benchmark reports back from JSON and CSV.

use std::path::Path;

use anyhow::Context;

use crate::types::{BenchmarkReport, ProofScore};
use crate::writer::CSV_HEADER;

/// Static methods for loading written reports.
pub struct ReportReader;

impl ReportReader {
    pub fn read_json(path: &Path) -> anyhow::Result<BenchmarkReport> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let report: BenchmarkReport = serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("malformed report {}", path.display()))?;
        Ok(report)
    }

    /// Read all rows. The header must match [`CSV_HEADER`] exactly.
    pub fn read_csv(path: &Path) -> anyhow::Result<Vec<ProofScore>> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        let header = reader.headers()?;
        if !header.iter().eq(CSV_HEADER.iter().copied()) {
            anyhow::bail!(
                "unexpected CSV header in {}: {:?}",
                path.display(),
                header.iter().collect::<Vec<_>>()
            );
        }

        let mut items = Vec::new();
        for row in reader.deserialize() {
            items.push(row?);
        }

        tracing::debug!(count = items.len(), path = %path.display(), "Read benchmark rows");
        Ok(items)
    }
}
