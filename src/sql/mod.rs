//! SQL analysis
//!
//! Recovers the tables a query depends on by walking its parsed AST.

pub mod extractor;

pub use extractor::{ParseError, TableExtractor, DEFAULT_DIALECT};
