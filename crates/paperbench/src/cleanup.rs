//! Post-benchmark cleanup.
//!
//! Restores the sample record's submitter and removes every probe record.
//! Not transactional; running it again after a partial failure is safe.

use tracing::info;

use crate::backends::Store;
use crate::config::{BenchConfig, PROBE_PREFIX};
use crate::error::BenchError;

/// Reverts the mutations made by a benchmark run.
pub struct Cleanup<'a> {
    config: &'a BenchConfig,
}

impl<'a> Cleanup<'a> {
    pub fn new(config: &'a BenchConfig) -> Self {
        Self { config }
    }

    /// Restore the sample record and purge probes, returning how many probe
    /// records were removed.
    pub fn run(&self, store: &mut dyn Store) -> Result<u64, BenchError> {
        let kind = store.kind();

        store
            .set_submitter(
                &self.config.sample_paper_id,
                &self.config.sample_original_submitter,
            )
            .map_err(|e| BenchError::operation(kind, "RESTORE_SAMPLE", e))?;

        let removed = store
            .purge_probes(PROBE_PREFIX)
            .map_err(|e| BenchError::operation(kind, "PURGE_PROBES", e))?;

        info!(store = %kind, removed, "Cleanup finished");
        Ok(removed)
    }
}
