//! Storage Layer - SQLite-backed persistence
//!
//! The pipeline owns these tables (no foreign keys; dangling links are
//! prevented by the pipeline instead):
//! - queries(id, engine, query_to_execute, primary_table, list_of_tables, ...)
//! - query_parameters(query_id, key, required, default_value)
//! - controls(id, title, severity, ..., query_id)
//! - control_tags(key, control_id, value)
//! - benchmarks(id, title, ..., metadata)
//! - benchmark_tags / benchmark_children / benchmark_controls
//! - query_views(id, title, description, query_id)
//! - query_view_dependencies(view_id, dependency_id)

pub mod mode;
pub mod schema;
pub mod sqlite;

pub use mode::{ClearScope, WriteMode};
pub use schema::OwnedTable;
pub use sqlite::{DbStats, SqliteStore};
