//! Catalog - the fully loaded, resolved in-memory configuration
//!
//! Controls and benchmarks live in arenas addressed by `ControlIdx` and
//! `BenchmarkIdx`, with identifier indexes alongside. Queries are keyed by id.

use crate::loader::LoadReport;
use crate::model::{
    Benchmark, BenchmarkIdx, BenchmarkMetadata, Control, ControlIdx, Query, QueryView,
};
use crate::resolver::MetadataSource;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct Catalog {
    queries: BTreeMap<String, Query>,
    controls: Vec<Control>,
    control_index: HashMap<String, ControlIdx>,
    benchmarks: Vec<Benchmark>,
    benchmark_index: HashMap<String, BenchmarkIdx>,
    views: Vec<QueryView>,
    report: LoadReport,
}

impl Catalog {
    pub(crate) fn from_parts(
        queries: BTreeMap<String, Query>,
        controls: Vec<Control>,
        control_index: HashMap<String, ControlIdx>,
        benchmarks: Vec<Benchmark>,
        benchmark_index: HashMap<String, BenchmarkIdx>,
        views: Vec<QueryView>,
        report: LoadReport,
    ) -> Self {
        Self {
            queries,
            controls,
            control_index,
            benchmarks,
            benchmark_index,
            views,
            report,
        }
    }

    // ========== Queries ==========

    pub fn query(&self, id: &str) -> Option<&Query> {
        self.queries.get(id)
    }

    /// All queries, ordered by id
    pub fn queries(&self) -> impl Iterator<Item = &Query> {
        self.queries.values()
    }

    // ========== Controls ==========

    pub fn control(&self, id: &str) -> Option<&Control> {
        self.control_index.get(id).map(|idx| &self.controls[idx.0])
    }

    pub fn control_at(&self, idx: ControlIdx) -> &Control {
        &self.controls[idx.0]
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    // ========== Benchmarks ==========

    pub fn benchmark(&self, id: &str) -> Option<&Benchmark> {
        self.benchmark_idx(id).map(|idx| &self.benchmarks[idx.0])
    }

    pub fn benchmark_idx(&self, id: &str) -> Option<BenchmarkIdx> {
        self.benchmark_index.get(id).copied()
    }

    pub fn benchmark_at(&self, idx: BenchmarkIdx) -> &Benchmark {
        &self.benchmarks[idx.0]
    }

    pub fn benchmarks(&self) -> &[Benchmark] {
        &self.benchmarks
    }

    pub(crate) fn benchmarks_mut(&mut self) -> &mut [Benchmark] {
        &mut self.benchmarks
    }

    /// Benchmarks no other benchmark lists as a child
    pub fn roots(&self) -> Vec<&Benchmark> {
        let mut is_child = vec![false; self.benchmarks.len()];
        for benchmark in &self.benchmarks {
            for child in &benchmark.child_refs {
                is_child[child.0] = true;
            }
        }
        self.benchmarks
            .iter()
            .zip(is_child)
            .filter(|(_, child)| !child)
            .map(|(b, _)| b)
            .collect()
    }

    // ========== Views ==========

    pub fn views(&self) -> &[QueryView] {
        &self.views
    }

    // ========== Report ==========

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub(crate) fn report_mut(&mut self) -> &mut LoadReport {
        &mut self.report
    }

    /// Controls of one benchmark plus the tables their queries use, children excluded
    pub fn direct_metadata_at(&self, idx: BenchmarkIdx) -> BenchmarkMetadata {
        let mut metadata = BenchmarkMetadata::default();
        for control_idx in &self.benchmarks[idx.0].control_refs {
            let control = self.control_at(*control_idx);
            metadata.controls.insert(control.id.clone());

            let Some(query) = control.query_id.as_deref().and_then(|q| self.query(q)) else {
                continue;
            };
            if let Some(primary) = &query.primary_table {
                metadata.primary_tables.insert(primary.clone());
            }
            metadata.list_of_tables.extend(query.list_of_tables.iter().cloned());
        }
        metadata
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            queries: self.queries.len(),
            controls: self.controls.len(),
            benchmarks: self.benchmarks.len(),
            roots: self.roots().len(),
            views: self.views.len(),
            warnings: self.report.warning_count(),
        }
    }
}

impl MetadataSource for Catalog {
    fn child_ids(&self, benchmark_id: &str) -> Vec<String> {
        self.benchmark(benchmark_id)
            .map(|b| {
                b.child_refs
                    .iter()
                    .map(|idx| self.benchmark_at(*idx).id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn direct_metadata(&self, benchmark_id: &str) -> BenchmarkMetadata {
        self.benchmark_idx(benchmark_id)
            .map(|idx| self.direct_metadata_at(idx))
            .unwrap_or_default()
    }
}

/// Statistics about a loaded catalog
#[derive(Debug, Clone)]
pub struct CatalogStats {
    pub queries: usize,
    pub controls: usize,
    pub benchmarks: usize,
    pub roots: usize,
    pub views: usize,
    pub warnings: usize,
}

impl std::fmt::Display for CatalogStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Catalog Statistics:")?;
        writeln!(f, "  Queries: {}", self.queries)?;
        writeln!(f, "  Controls: {}", self.controls)?;
        writeln!(f, "  Benchmarks: {} (roots: {})", self.benchmarks, self.roots)?;
        writeln!(f, "  Query views: {}", self.views)?;
        writeln!(f, "  Load warnings: {}", self.warnings)
    }
}
