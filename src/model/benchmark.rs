//! Benchmarks - hierarchical groupings of controls and other benchmarks
//!
//! Benchmarks live in an arena owned by the catalog. Children and member
//! controls are declared by identifier and resolved to arena indices in a
//! second pass, so a child may be shared by several parents.

use super::tag::TagMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Index of a benchmark in the catalog arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BenchmarkIdx(pub usize);

/// Index of a control in the catalog arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlIdx(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Benchmark {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Display code, e.g. a section number
    pub section_code: String,
    pub tags: TagMap,
    pub auto_assign: bool,
    pub tracks_drift_events: bool,
    pub integration_types: BTreeSet<String>,
    /// Declared child identifiers, in file order
    pub children: Vec<String>,
    /// Declared member control identifiers, in file order
    pub controls: Vec<String>,
    /// Children that resolved to a loaded benchmark
    #[serde(skip)]
    pub child_refs: Vec<BenchmarkIdx>,
    /// Member controls that resolved to a loaded control
    #[serde(skip)]
    pub control_refs: Vec<ControlIdx>,
    /// Derived transitive metadata, filled by the resolver
    pub metadata: BenchmarkMetadata,
}

impl Benchmark {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            section_code: String::new(),
            tags: TagMap::new(),
            auto_assign: false,
            tracks_drift_events: false,
            integration_types: BTreeSet::new(),
            children: Vec::new(),
            controls: Vec::new(),
            child_refs: Vec::new(),
            control_refs: Vec::new(),
            metadata: BenchmarkMetadata::default(),
        }
    }

    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_controls<I, S>(mut self, controls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.controls = controls.into_iter().map(Into::into).collect();
        self
    }
}

/// Transitive closure of a benchmark's subtree.
///
/// Sets are ordered, so the serialized blob is sorted and stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkMetadata {
    pub controls: BTreeSet<String>,
    pub primary_tables: BTreeSet<String>,
    pub list_of_tables: BTreeSet<String>,
}

impl BenchmarkMetadata {
    /// Union another triple into this one
    pub fn merge(&mut self, other: &BenchmarkMetadata) {
        self.controls.extend(other.controls.iter().cloned());
        self.primary_tables.extend(other.primary_tables.iter().cloned());
        self.list_of_tables.extend(other.list_of_tables.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty() && self.primary_tables.is_empty() && self.list_of_tables.is_empty()
    }

    /// Serialize to the opaque blob stored with the benchmark row
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_merge_dedupes() {
        let mut a = BenchmarkMetadata::default();
        a.controls.insert("k1".to_string());
        a.list_of_tables.insert("t1".to_string());

        let mut b = BenchmarkMetadata::default();
        b.controls.insert("k1".to_string());
        b.controls.insert("k2".to_string());
        b.primary_tables.insert("t1".to_string());

        a.merge(&b);
        assert_eq!(a.controls.len(), 2);
        assert_eq!(a.primary_tables.len(), 1);
        assert_eq!(a.list_of_tables.len(), 1);
    }

    #[test]
    fn test_metadata_json_is_sorted() {
        let mut meta = BenchmarkMetadata::default();
        meta.controls.insert("zeta".to_string());
        meta.controls.insert("alpha".to_string());
        meta.list_of_tables.insert("b_table".to_string());
        meta.list_of_tables.insert("a_table".to_string());

        let json = meta.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"controls":["alpha","zeta"],"primary_tables":[],"list_of_tables":["a_table","b_table"]}"#
        );
        assert_eq!(BenchmarkMetadata::from_json(&json).unwrap(), meta);
    }
}
