//! Entity types for the in-memory configuration model
//!
//! - `Query` / `QueryParameter`: executable statements
//! - `Control`: leaf compliance rules, optionally backed by a query
//! - `Benchmark`: hierarchical groupings with derived `BenchmarkMetadata`
//! - `QueryView`: auxiliary named queries
//! - `Tag`: key → multi-value labels

pub mod benchmark;
pub mod control;
pub mod query;
pub mod tag;
pub mod view;

pub use benchmark::{Benchmark, BenchmarkIdx, BenchmarkMetadata, ControlIdx};
pub use control::{Control, Severity};
pub use query::{Query, QueryParameter, DEFAULT_ENGINE};
pub use tag::{Tag, TagMap, RESERVED_TAG_PREFIX};
pub use view::QueryView;
