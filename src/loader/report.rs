//! Non-fatal findings collected while loading a configuration tree

use serde::Serialize;

/// A declared benchmark link whose target was never loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedLink {
    pub benchmark_id: String,
    pub target_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub query_files: usize,
    pub control_files: usize,
    pub benchmark_files: usize,
    pub view_files: usize,
    pub enrichment_entries: usize,
    /// Later definitions of an already-loaded query id
    pub duplicate_queries: Vec<String>,
    /// Later definitions of an already-loaded control id
    pub duplicate_controls: Vec<String>,
    /// Later definitions of an already-loaded query view id
    pub duplicate_views: Vec<String>,
    /// Standalone queries that failed to parse and nothing referenced
    pub dropped_queries: Vec<String>,
    /// Query views whose query failed to parse
    pub dropped_views: Vec<String>,
    pub unresolved_children: Vec<UnresolvedLink>,
    pub unresolved_controls: Vec<UnresolvedLink>,
    /// Benchmarks at which a cycle was cut during resolution
    pub cycles: Vec<String>,
}

impl LoadReport {
    pub fn warning_count(&self) -> usize {
        self.duplicate_queries.len()
            + self.duplicate_controls.len()
            + self.duplicate_views.len()
            + self.dropped_queries.len()
            + self.dropped_views.len()
            + self.unresolved_children.len()
            + self.unresolved_controls.len()
            + self.cycles.len()
    }

    pub fn is_clean(&self) -> bool {
        self.warning_count() == 0
    }
}

impl std::fmt::Display for LoadReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Load Report:")?;
        writeln!(f, "  Query files: {}", self.query_files)?;
        writeln!(f, "  Control files: {}", self.control_files)?;
        writeln!(f, "  Benchmark files: {}", self.benchmark_files)?;
        writeln!(f, "  Query view files: {}", self.view_files)?;
        writeln!(f, "  Enrichment entries: {}", self.enrichment_entries)?;

        if !self.duplicate_queries.is_empty() {
            writeln!(f, "  Duplicate queries: {}", self.duplicate_queries.join(", "))?;
        }
        if !self.duplicate_controls.is_empty() {
            writeln!(f, "  Duplicate controls: {}", self.duplicate_controls.join(", "))?;
        }
        if !self.duplicate_views.is_empty() {
            writeln!(f, "  Duplicate query views: {}", self.duplicate_views.join(", "))?;
        }
        if !self.dropped_queries.is_empty() {
            writeln!(f, "  Dropped queries: {}", self.dropped_queries.join(", "))?;
        }
        if !self.dropped_views.is_empty() {
            writeln!(f, "  Dropped views: {}", self.dropped_views.join(", "))?;
        }
        for link in &self.unresolved_children {
            writeln!(f, "  Unresolved child: {} -> {}", link.benchmark_id, link.target_id)?;
        }
        for link in &self.unresolved_controls {
            writeln!(f, "  Unresolved control: {} -> {}", link.benchmark_id, link.target_id)?;
        }
        if !self.cycles.is_empty() {
            writeln!(f, "  Cycles cut at: {}", self.cycles.join(", "))?;
        }
        Ok(())
    }
}
