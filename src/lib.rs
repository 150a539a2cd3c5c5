//! # Benchsync - Compliance configuration sync engine
//!
//! Turns a declarative file tree of benchmarks, controls, queries and
//! enrichment text into a consistent relational dataset.
//!
//! Benchsync provides:
//! - SQL table-reference extraction over the parsed statement AST
//! - Loaders that build an arena-backed catalog from definition files
//! - Memoized resolution of transitive benchmark metadata
//! - A step-ordered, conflict-tolerant SQLite synchronization pipeline

pub mod catalog;
pub mod config;
pub mod ignore;
pub mod loader;
pub mod model;
pub mod resolver;
pub mod sql;
pub mod storage;
pub mod sync;
pub mod ui;

use std::path::PathBuf;

// Re-exports for convenient access
pub use catalog::Catalog;
pub use config::BenchsyncConfig;
pub use loader::{CatalogBuilder, LoadReport};
pub use model::{Benchmark, BenchmarkMetadata, Control, Query, QueryParameter, Severity};
pub use resolver::{MetadataResolver, MetadataSource};
pub use sql::{ParseError, TableExtractor};
pub use storage::SqliteStore;
pub use sync::{
    sync, ClearScope, SyncCoordinator, SyncOptions, SyncPipeline, SyncReport, SyncStep, WriteMode,
};

/// Result type alias for Benchsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Benchsync operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] ::ignore::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed definition {}: {source}", path.display())]
    Definition {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("SQL parse error in query {query_id}: {source}")]
    Sql {
        query_id: String,
        #[source]
        source: ParseError,
    },

    #[error("Duplicate benchmark id {id} ({} and {})", first.display(), second.display())]
    DuplicateBenchmark {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Unknown SQL dialect: {0}")]
    UnknownDialect(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("A synchronization run is already in progress")]
    SyncInProgress,

    #[error("Synchronization cancelled before step {0}")]
    Cancelled(SyncStep),
}

impl Error {
    /// Whether a failed `sync` stopped before any step committed.
    ///
    /// Load errors happen before the first write. A cancellation counts only
    /// when it hit the clear step; storage errors may follow committed steps.
    pub fn leaves_store_untouched(&self) -> bool {
        match self {
            Error::Storage(_) => false,
            Error::Cancelled(step) => *step == SyncStep::Clear,
            _ => true,
        }
    }
}
