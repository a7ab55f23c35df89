//! Error types.

use thiserror::Error;

use crate::backends::StoreKind;

/// Errors raised by a store adapter.
///
/// The underlying client's error is kept as the source so its native
/// message reaches the user unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    /// PostgreSQL driver error.
    #[error("postgres: {0}")]
    Postgres(#[from] sqlx::Error),

    /// MongoDB driver error.
    #[error("mongodb: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// Failed to convert a paper into a BSON document.
    #[error("bson: {0}")]
    Bson(#[from] mongodb::bson::ser::Error),

    /// Redis client error.
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    /// The store has no native way to perform the operation.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
}

/// Result alias for store adapter calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the benchmark pipeline.
#[derive(Debug, Error)]
pub enum BenchError {
    /// A store could not be reached at startup.
    #[error("connection to {store} failed: {source}")]
    Connection {
        store: StoreKind,
        #[source]
        source: StoreError,
    },

    /// A corpus line failed to parse.
    #[error("malformed record on line {line}: {source}")]
    MalformedRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A load, benchmark or cleanup call failed.
    #[error("{store} {operation} failed: {source}")]
    Operation {
        store: StoreKind,
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    /// Corpus or results file I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BenchError {
    /// Wrap a store error raised while performing `operation`.
    pub fn operation(store: StoreKind, operation: &'static str, source: StoreError) -> Self {
        BenchError::Operation {
            store,
            operation,
            source,
        }
    }
}
