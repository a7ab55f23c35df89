//! paperbench
//!
//! Loads a newline-delimited JSON corpus of paper metadata into PostgreSQL,
//! MongoDB and Redis, each in its idiomatic schema, then times the same
//! battery of CRUD and query operations against all three.
//!
//! # Pipeline
//!
//! - **Loader**: clears a store and streams the corpus into it
//! - **Benchmark runner**: runs the fixed operation battery, one timed
//!   result per operation
//! - **Cleanup**: restores the sample record and removes probe records
//! - **Driver**: connects to every store, dispatches an [`Action`] and
//!   releases the connections
//!
//! Store adapters implement the [`Store`] capability trait; timing and result
//! shaping are written once in [`harness`].

pub mod backends;
pub mod cleanup;
pub mod config;
pub mod corpus;
pub mod driver;
pub mod error;
pub mod harness;
pub mod loader;
pub mod paper;
pub mod results;

pub use backends::{MongoBackend, PostgresBackend, RedisBackend, Store, StoreKind};
pub use cleanup::Cleanup;
pub use config::BenchConfig;
pub use corpus::CorpusReader;
pub use driver::{Action, Driver, RunReport};
pub use error::{BenchError, StoreError, StoreResult};
pub use harness::{BenchResult, BenchmarkRunner, Operation};
pub use loader::{LoadSummary, Loader};
pub use paper::{Paper, PaperSnapshot};
pub use results::ResultsWriter;
