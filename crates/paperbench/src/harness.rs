//! Benchmark battery and timing harness.
//!
//! The battery is written once here. Each step is timed with a wall-clock
//! delta around the adapter call and shaped into a [`BenchResult`].

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backends::{Store, StoreKind};
use crate::config::{BenchConfig, BENCH_DOI, BENCH_SUBMITTER, PROBE_PREFIX, QUERY_LIMIT};
use crate::error::{BenchError, StoreResult};

/// One step of the battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    WriteCreateBulk,
    ReadByPrimaryKey,
    ReadByCategory,
    FullTextSearchNoIndex,
    FullTextSearchWithIndex,
    AggregateCount,
    UpdateOneById,
    UpdateMany,
    DeleteBulkById,
}

impl Operation {
    /// Execution order. Reads of the sample record precede its update, and
    /// probe creation precedes the operations that target the probes.
    pub const BATTERY: [Operation; 9] = [
        Operation::WriteCreateBulk,
        Operation::ReadByPrimaryKey,
        Operation::ReadByCategory,
        Operation::FullTextSearchNoIndex,
        Operation::FullTextSearchWithIndex,
        Operation::AggregateCount,
        Operation::UpdateOneById,
        Operation::UpdateMany,
        Operation::DeleteBulkById,
    ];

    /// Result label of this operation on `store`.
    ///
    /// The category read is named after the mechanism each store uses.
    pub fn label(self, store: StoreKind) -> &'static str {
        match (self, store) {
            (Operation::ReadByCategory, StoreKind::Postgres) => "READ_JOIN_BY_CATEGORY",
            (Operation::ReadByCategory, StoreKind::Mongo) => "READ_IN_ARRAY_BY_CATEGORY",
            (Operation::ReadByCategory, StoreKind::Redis) => "READ_BY_CATEGORY",
            (Operation::WriteCreateBulk, _) => "WRITE_CREATE_BULK",
            (Operation::ReadByPrimaryKey, _) => "READ_BY_PRIMARY_KEY",
            (Operation::FullTextSearchNoIndex, _) => "READ_FULL_TEXT_SEARCH_NO_INDEX",
            (Operation::FullTextSearchWithIndex, _) => "READ_FULL_TEXT_SEARCH_WITH_INDEX",
            (Operation::AggregateCount, _) => "READ_AGGREGATE_COUNT",
            (Operation::UpdateOneById, _) => "UPDATE_ONE_BY_ID",
            (Operation::UpdateMany, _) => "UPDATE_MANY",
            (Operation::DeleteBulkById, _) => "DELETE_BULK_BY_ID",
        }
    }

    /// Declared number of records the operation processes.
    pub fn records_processed(self, config: &BenchConfig) -> usize {
        match self {
            Operation::WriteCreateBulk | Operation::UpdateMany | Operation::DeleteBulkById => {
                config.bulk_size
            }
            Operation::ReadByPrimaryKey | Operation::UpdateOneById => config.read_iterations,
            Operation::ReadByCategory
            | Operation::FullTextSearchNoIndex
            | Operation::FullTextSearchWithIndex => QUERY_LIMIT,
            Operation::AggregateCount => 1,
        }
    }
}

/// One timed operation.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchResult {
    pub store: StoreKind,
    pub operation: &'static str,
    pub elapsed: Duration,
    pub records_processed: usize,
    pub completed_at: DateTime<Utc>,
}

impl BenchResult {
    /// Elapsed wall-clock time in seconds.
    pub fn seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Generate `count` collision-resistant probe ids.
pub fn probe_ids(count: usize) -> Vec<String> {
    (0..count)
        .map(|_| format!("{}{}", PROBE_PREFIX, Uuid::new_v4()))
        .collect()
}

/// Run `op` and return its result alongside the elapsed wall-clock time.
fn timed<T>(op: impl FnOnce() -> StoreResult<T>) -> StoreResult<(T, Duration)> {
    let start = Instant::now();
    let value = op()?;
    Ok((value, start.elapsed()))
}

/// Executes the battery against one store.
pub struct BenchmarkRunner<'a> {
    config: &'a BenchConfig,
}

impl<'a> BenchmarkRunner<'a> {
    pub fn new(config: &'a BenchConfig) -> Self {
        Self { config }
    }

    /// Run every supported operation in [`Operation::BATTERY`] order.
    ///
    /// The first failure aborts the rest of the battery for this store.
    pub fn run(&self, store: &mut dyn Store) -> Result<Vec<BenchResult>, BenchError> {
        let kind = store.kind();
        info!(store = %kind, "Running benchmark");

        let probes = probe_ids(self.config.bulk_size);
        let mut results = Vec::with_capacity(Operation::BATTERY.len());

        for op in Operation::BATTERY {
            let label = op.label(kind);
            if !store.supports(op) {
                debug!(store = %kind, operation = label, "Skipping unsupported operation");
                continue;
            }

            let elapsed = self
                .execute(store, op, &probes)
                .map_err(|e| BenchError::operation(kind, label, e))?;

            let result = BenchResult {
                store: kind,
                operation: label,
                elapsed,
                records_processed: op.records_processed(self.config),
                completed_at: Utc::now(),
            };
            debug!(
                store = %kind,
                operation = label,
                seconds = result.seconds(),
                records = result.records_processed,
                "Operation finished"
            );
            results.push(result);
        }

        info!(store = %kind, operations = results.len(), "Benchmark finished");
        Ok(results)
    }

    /// Perform one operation and return the timed portion.
    fn execute(
        &self,
        store: &mut dyn Store,
        op: Operation,
        probes: &[String],
    ) -> StoreResult<Duration> {
        let config = self.config;
        let elapsed = match op {
            Operation::WriteCreateBulk => timed(|| store.create_probes(probes))?.1,
            Operation::ReadByPrimaryKey => {
                timed(|| {
                    for _ in 0..config.read_iterations {
                        store.fetch_paper(&config.sample_paper_id)?;
                    }
                    Ok(())
                })?
                .1
            }
            Operation::ReadByCategory => {
                timed(|| store.papers_in_category(&config.sample_category, QUERY_LIMIT))?.1
            }
            Operation::FullTextSearchNoIndex => {
                timed(|| store.search_abstracts(&config.search_term, QUERY_LIMIT))?.1
            }
            Operation::FullTextSearchWithIndex => {
                // Index build and drop are outside the timed region.
                store.create_text_index()?;
                let outcome = timed(|| store.search_abstracts_indexed(&config.search_term, QUERY_LIMIT));
                if let Err(e) = store.drop_text_index() {
                    if outcome.is_ok() {
                        return Err(e);
                    }
                    // The search error is the one reported.
                    warn!(store = %store.kind(), error = %e, "Failed to drop text index");
                }
                outcome?.1
            }
            Operation::AggregateCount => timed(|| store.count_distinct_authors())?.1,
            Operation::UpdateOneById => {
                timed(|| {
                    for _ in 0..config.read_iterations {
                        store.set_submitter(&config.sample_paper_id, BENCH_SUBMITTER)?;
                    }
                    Ok(())
                })?
                .1
            }
            Operation::UpdateMany => timed(|| store.update_probes(probes, BENCH_DOI))?.1,
            Operation::DeleteBulkById => timed(|| store.delete_probes(probes))?.1,
        };
        Ok(elapsed)
    }
}
