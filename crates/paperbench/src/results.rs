//! Results file writer.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::SecondsFormat;
use tracing::info;

use crate::error::BenchError;
use crate::harness::BenchResult;

/// Column order of the results file.
pub const HEADER: [&str; 5] = [
    "timestamp",
    "database",
    "operation",
    "records_processed",
    "time_seconds",
];

/// Appends benchmark results to a CSV file.
///
/// The header is written only when the file is new or empty, so results of
/// successive runs accumulate in one table.
pub struct ResultsWriter {
    path: PathBuf,
}

impl ResultsWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row per result.
    pub fn append(&self, results: &[BenchResult]) -> Result<(), BenchError> {
        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut out = BufWriter::new(file);

        if needs_header {
            writeln!(out, "{}", HEADER.join(","))?;
        }
        for result in results {
            writeln!(out, "{}", format_row(result))?;
        }
        out.flush()?;

        info!(
            path = %self.path.display(),
            rows = results.len(),
            "Benchmark results appended"
        );
        Ok(())
    }
}

/// Format one result as a CSV row.
fn format_row(result: &BenchResult) -> String {
    [
        result
            .completed_at
            .to_rfc3339_opts(SecondsFormat::Micros, true),
        escape_csv(result.store.display_name()),
        escape_csv(result.operation),
        result.records_processed.to_string(),
        format!("{:.6}", result.seconds()),
    ]
    .join(",")
}

/// Quote a field when it contains a delimiter, quote or newline.
fn escape_csv(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
