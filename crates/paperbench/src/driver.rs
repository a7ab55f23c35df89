//! Top-level driver.
//!
//! Owns one connection per store for the lifetime of a run, dispatches the
//! requested action through the pipeline stages and releases every
//! connection exactly once, whatever the outcome.

use std::fmt;

use clap::ValueEnum;
use tracing::{info, warn};

use crate::backends::{MongoBackend, PostgresBackend, RedisBackend, Store};
use crate::cleanup::Cleanup;
use crate::config::BenchConfig;
use crate::error::BenchError;
use crate::harness::{BenchResult, BenchmarkRunner};
use crate::loader::{LoadSummary, Loader};
use crate::results::ResultsWriter;

/// What a run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Reload the corpus into every store.
    Load,
    /// Run the battery against already loaded stores, then clean up.
    Benchmark,
    /// Load, then benchmark.
    #[value(name = "run_all")]
    RunAll,
}

impl Action {
    fn loads(self) -> bool {
        matches!(self, Action::Load | Action::RunAll)
    }

    fn benchmarks(self) -> bool {
        matches!(self, Action::Benchmark | Action::RunAll)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Load => write!(f, "load"),
            Action::Benchmark => write!(f, "benchmark"),
            Action::RunAll => write!(f, "run_all"),
        }
    }
}

/// Everything a successful run produced.
#[derive(Debug, Default)]
pub struct RunReport {
    pub loads: Vec<LoadSummary>,
    pub results: Vec<BenchResult>,
    pub probes_removed: u64,
}

/// Runs an action against a set of stores.
pub struct Driver {
    config: BenchConfig,
    stores: Vec<Box<dyn Store>>,
}

impl Driver {
    /// Connect to PostgreSQL, MongoDB and Redis.
    ///
    /// All or nothing: if any connection fails, the ones already opened are
    /// closed and the error is returned before any data is touched.
    pub fn connect(config: BenchConfig) -> Result<Self, BenchError> {
        let mut driver = Self::with_stores(config, Vec::new());
        let config = &driver.config;

        driver
            .stores
            .push(Box::new(PostgresBackend::connect(&config.postgres_url)?));
        driver.stores.push(Box::new(MongoBackend::connect(
            &config.mongo_url,
            &config.mongo_database,
        )?));
        driver
            .stores
            .push(Box::new(RedisBackend::connect(&config.redis_url)?));

        Ok(driver)
    }

    /// Build a driver over already connected stores, run in the given order.
    ///
    /// The stores are closed when the driver is dropped.
    pub fn with_stores(config: BenchConfig, stores: Vec<Box<dyn Store>>) -> Self {
        Self { config, stores }
    }

    /// Run `action`, then close every store.
    pub fn run(mut self, action: Action) -> Result<RunReport, BenchError> {
        let outcome = self.dispatch(action);
        self.close_all();
        outcome
    }

    fn dispatch(&mut self, action: Action) -> Result<RunReport, BenchError> {
        let mut report = RunReport::default();

        if action.loads() {
            info!("Loading data");
            let loader = Loader::new(&self.config);
            for store in self.stores.iter_mut() {
                report.loads.push(loader.load(store.as_mut())?);
            }
            info!("Data loading complete");
        }

        if action.benchmarks() {
            info!("Running benchmarks");
            let runner = BenchmarkRunner::new(&self.config);
            for store in self.stores.iter_mut() {
                report.results.extend(runner.run(store.as_mut())?);
            }

            ResultsWriter::new(&self.config.results_path).append(&report.results)?;

            info!("Benchmarking complete, cleaning up");
            let cleanup = Cleanup::new(&self.config);
            for store in self.stores.iter_mut() {
                report.probes_removed += cleanup.run(store.as_mut())?;
            }
            info!("Cleanup complete");
        }

        Ok(report)
    }

    fn close_all(&mut self) {
        if self.stores.is_empty() {
            return;
        }
        info!("Closing database connections");
        for mut store in self.stores.drain(..) {
            if let Err(e) = store.close() {
                warn!(store = %store.kind(), error = %e, "Failed to close connection");
            }
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.close_all();
    }
}
