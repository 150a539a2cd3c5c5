//! Resolution of derived benchmark data
//!
//! - `metadata`: transitive control and table closure, memoized per benchmark id
//! - `integration`: bottom-up integration types for undeclared benchmarks

pub mod integration;
pub mod metadata;

pub use integration::fill_integration_types;
pub use metadata::{resolve_catalog_metadata, MetadataResolver, MetadataSource};
