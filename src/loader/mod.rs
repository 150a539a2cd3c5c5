//! Loaders - definition files to an in-memory `Catalog`
//!
//! One `CatalogBuilder` per invocation walks the configuration tree:
//! enrichment text, standalone queries, controls (with embedded queries),
//! query views, then benchmarks. `finish` links benchmarks by id, rejects
//! duplicate benchmark ids and derives integration types and metadata.

pub mod benchmark;
pub mod builder;
pub mod control;
mod de;
pub mod enrichment;
pub mod query;
pub mod report;
pub mod view;
pub mod walk;

pub use builder::CatalogBuilder;
pub use enrichment::{Enrichment, EnrichmentCategory};
pub use query::QueryDef;
pub use report::{LoadReport, UnresolvedLink};
