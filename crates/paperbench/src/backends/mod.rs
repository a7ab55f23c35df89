//! Store adapters.
//!
//! Each adapter maps the shared paper model onto one store's native schema
//! and implements the operation bodies of the benchmark battery. Timing,
//! ordering and result shaping live in [`crate::harness`]; adapters only do
//! the store work.

pub mod mongo;
pub mod postgres;
pub mod redis;

use std::fmt;

pub use self::mongo::MongoBackend;
pub use self::postgres::PostgresBackend;
pub use self::redis::RedisBackend;

use crate::config::LOAD_BATCH_SIZE;
use crate::error::{StoreError, StoreResult};
use crate::harness::Operation;
use crate::paper::{Paper, PaperSnapshot};

/// The stores under comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// Relational store.
    Postgres,
    /// Document store.
    Mongo,
    /// Key/structure store.
    Redis,
}

impl StoreKind {
    /// Name written to the `database` results column.
    pub fn display_name(&self) -> &'static str {
        match self {
            StoreKind::Postgres => "PostgreSQL",
            StoreKind::Mongo => "MongoDB",
            StoreKind::Redis => "Redis",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Capability interface implemented by every store adapter.
///
/// Methods with a default body return [`StoreError::Unsupported`]; an
/// adapter that leaves them unimplemented must also report the matching
/// operation as unsupported from [`Store::supports`].
pub trait Store {
    /// Which store this adapter talks to.
    fn kind(&self) -> StoreKind;

    /// Records per [`Store::ingest`] call during a load.
    fn load_batch_size(&self) -> usize {
        LOAD_BATCH_SIZE
    }

    /// Whether the store has a native realization of an operation.
    fn supports(&self, _op: Operation) -> bool {
        true
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    /// Destructively clear everything a load writes.
    fn clear(&mut self) -> StoreResult<()>;

    /// Write one batch of corpus records in the store's native shape.
    fn ingest(&mut self, papers: &[Paper]) -> StoreResult<()>;

    /// Number of paper records currently stored.
    fn count_papers(&mut self) -> StoreResult<u64>;

    // -------------------------------------------------------------------------
    // Battery
    // -------------------------------------------------------------------------

    /// Insert minimal probe records with the given ids.
    fn create_probes(&mut self, ids: &[String]) -> StoreResult<()>;

    /// Point read by primary key.
    fn fetch_paper(&mut self, id: &str) -> StoreResult<Option<PaperSnapshot>>;

    /// Ids of up to `limit` papers tagged with `category`.
    fn papers_in_category(&mut self, category: &str, limit: usize) -> StoreResult<Vec<String>>;

    /// Unindexed case-insensitive search of abstracts.
    fn search_abstracts(&mut self, _term: &str, _limit: usize) -> StoreResult<Vec<String>> {
        Err(StoreError::Unsupported("unindexed abstract search"))
    }

    /// Build the full-text index used by [`Store::search_abstracts_indexed`].
    fn create_text_index(&mut self) -> StoreResult<()> {
        Err(StoreError::Unsupported("full-text index"))
    }

    /// Index-backed abstract search.
    fn search_abstracts_indexed(&mut self, _term: &str, _limit: usize) -> StoreResult<Vec<String>> {
        Err(StoreError::Unsupported("indexed abstract search"))
    }

    /// Drop the full-text index.
    fn drop_text_index(&mut self) -> StoreResult<()> {
        Err(StoreError::Unsupported("full-text index"))
    }

    /// Number of distinct authors across the dataset.
    fn count_distinct_authors(&mut self) -> StoreResult<u64> {
        Err(StoreError::Unsupported("distinct author count"))
    }

    /// Set the submitter of one paper.
    fn set_submitter(&mut self, id: &str, submitter: &str) -> StoreResult<()>;

    /// Set the DOI of every probe record in one bulk operation.
    fn update_probes(&mut self, _ids: &[String], _doi: &str) -> StoreResult<u64> {
        Err(StoreError::Unsupported("bulk update"))
    }

    /// Delete the given probe records.
    fn delete_probes(&mut self, ids: &[String]) -> StoreResult<u64>;

    // -------------------------------------------------------------------------
    // Cleanup
    // -------------------------------------------------------------------------

    /// Delete every record whose id starts with `prefix`.
    fn purge_probes(&mut self, prefix: &str) -> StoreResult<u64>;

    /// Number of records whose id starts with `prefix`.
    fn count_probes(&mut self, prefix: &str) -> StoreResult<u64>;

    /// Release the connection. Called exactly once by the driver.
    fn close(&mut self) -> StoreResult<()> {
        Ok(())
    }
}
