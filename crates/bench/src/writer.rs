//! Writes benchmark reports as pretty JSON and CSV.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::types::{BenchmarkReport, ProofScore};

/// CSV column order. Matches the field order of [`ProofScore`].
pub const CSV_HEADER: [&str; 10] = [
    "id",
    "domain",
    "difficulty",
    "expected_validity",
    "symbolic_score",
    "semantic_score",
    "hybrid_score",
    "confidence_low",
    "confidence_high",
    "passed",
];

/// Locations of the two files written for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
}

/// Writes `<name>.json` and `<name>.csv` into an output directory.
pub struct ReportWriter {
    output_dir: PathBuf,
    name: String,
}

impl ReportWriter {
    pub fn new(output_dir: PathBuf, name: impl Into<String>) -> Self {
        Self {
            output_dir,
            name: name.into(),
        }
    }

    pub fn paths(&self) -> ReportPaths {
        ReportPaths {
            json: self.output_dir.join(format!("{}.json", self.name)),
            csv: self.output_dir.join(format!("{}.csv", self.name)),
        }
    }

    /// Write both files, creating the output directory if needed.
    pub fn write(&self, report: &BenchmarkReport) -> anyhow::Result<ReportPaths> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("failed to create output dir {}", self.output_dir.display())
        })?;
        let paths = self.paths();
        Self::write_json(&paths.json, report)?;
        Self::write_csv(&paths.csv, &report.items)?;

        tracing::info!(
            items = report.items.len(),
            json = %paths.json.display(),
            csv = %paths.csv.display(),
            "Wrote benchmark report"
        );
        Ok(paths)
    }

    /// `{meta, items}` as indented JSON.
    pub fn write_json(path: &Path, report: &BenchmarkReport) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer.flush()?;
        Ok(())
    }

    /// One row per item under [`CSV_HEADER`]. The header is written even
    /// when there are no items.
    pub fn write_csv(path: &Path, items: &[ProofScore]) -> anyhow::Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        writer.write_record(CSV_HEADER)?;
        for item in items {
            writer.serialize(item)?;
        }
        writer.flush()?;
        Ok(())
    }
}
