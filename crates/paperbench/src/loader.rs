//! Corpus loader.
//!
//! Clears the store, then streams the corpus into it in batches sized by the
//! adapter. Loading is never incremental.

use std::time::{Duration, Instant};

use tracing::info;

use crate::backends::{Store, StoreKind};
use crate::config::{BenchConfig, PROGRESS_INTERVAL};
use crate::corpus::CorpusReader;
use crate::error::BenchError;
use crate::paper::Paper;

/// Outcome of a completed load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub store: StoreKind,
    pub records: usize,
    pub elapsed: Duration,
}

/// Loads the configured corpus into a store.
pub struct Loader<'a> {
    config: &'a BenchConfig,
}

impl<'a> Loader<'a> {
    pub fn new(config: &'a BenchConfig) -> Self {
        Self { config }
    }

    /// Load the corpus file named in the configuration.
    pub fn load(&self, store: &mut dyn Store) -> Result<LoadSummary, BenchError> {
        let corpus = CorpusReader::open(&self.config.data_file, self.config.record_limit)?;
        self.load_from(store, corpus)
    }

    /// Load from an already opened corpus.
    ///
    /// The first malformed line aborts the load.
    pub fn load_from<I>(&self, store: &mut dyn Store, corpus: I) -> Result<LoadSummary, BenchError>
    where
        I: IntoIterator<Item = Result<Paper, BenchError>>,
    {
        let kind = store.kind();
        let start = Instant::now();
        info!(store = %kind, "Starting data load");

        store
            .clear()
            .map_err(|e| BenchError::operation(kind, "CLEAR", e))?;
        info!(store = %kind, "Cleared existing data");

        let batch_size = store.load_batch_size().max(1);
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = 0usize;

        for paper in corpus {
            batch.push(paper?);
            records += 1;

            if batch.len() >= batch_size {
                store
                    .ingest(&batch)
                    .map_err(|e| BenchError::operation(kind, "LOAD", e))?;
                batch.clear();
            }
            if records % PROGRESS_INTERVAL == 0 {
                info!(store = %kind, records, "Load progress");
            }
        }

        if !batch.is_empty() {
            store
                .ingest(&batch)
                .map_err(|e| BenchError::operation(kind, "LOAD", e))?;
        }

        let summary = LoadSummary {
            store: kind,
            records,
            elapsed: start.elapsed(),
        };
        info!(
            store = %kind,
            records,
            seconds = summary.elapsed.as_secs_f64(),
            "Finished data load"
        );
        Ok(summary)
    }
}
