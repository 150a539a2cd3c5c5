//! Memoized resolution of transitive benchmark metadata

use crate::catalog::Catalog;
use crate::model::BenchmarkMetadata;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Where the resolver reads the benchmark graph from
pub trait MetadataSource {
    /// Identifiers of the resolved children of a benchmark
    fn child_ids(&self, benchmark_id: &str) -> Vec<String>;

    /// Controls attached directly to a benchmark and the tables their queries use
    fn direct_metadata(&self, benchmark_id: &str) -> BenchmarkMetadata;
}

/// Post-order resolver with a per-identifier cache.
///
/// Each benchmark's direct metadata is read once, however many parents reach it.
pub struct MetadataResolver<'a, S: MetadataSource + ?Sized> {
    source: &'a S,
    cache: HashMap<String, BenchmarkMetadata>,
    in_progress: HashSet<String>,
    cycles: Vec<String>,
}

impl<'a, S: MetadataSource + ?Sized> MetadataResolver<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            cache: HashMap::new(),
            in_progress: HashSet::new(),
            cycles: Vec::new(),
        }
    }

    /// Resolve the closure of `benchmark_id`, caching it and every descendant
    pub fn resolve(&mut self, benchmark_id: &str) -> BenchmarkMetadata {
        if let Some(hit) = self.cache.get(benchmark_id) {
            return hit.clone();
        }
        self.resolve_uncached(benchmark_id);
        self.cache.get(benchmark_id).cloned().unwrap_or_default()
    }

    fn resolve_uncached(&mut self, benchmark_id: &str) {
        if !self.in_progress.insert(benchmark_id.to_string()) {
            warn!("Benchmark cycle detected at {}, ignoring back edge", benchmark_id);
            self.cycles.push(benchmark_id.to_string());
            return;
        }

        let mut metadata = self.source.direct_metadata(benchmark_id);
        for child in self.source.child_ids(benchmark_id) {
            if !self.cache.contains_key(&child) {
                self.resolve_uncached(&child);
            }
            if let Some(resolved) = self.cache.get(&child) {
                metadata.merge(resolved);
            }
        }

        debug!(
            "Resolved benchmark {}: {} controls, {} tables",
            benchmark_id,
            metadata.controls.len(),
            metadata.list_of_tables.len()
        );
        self.in_progress.remove(benchmark_id);
        self.cache.insert(benchmark_id.to_string(), metadata);
    }

    pub fn cached(&self, benchmark_id: &str) -> Option<&BenchmarkMetadata> {
        self.cache.get(benchmark_id)
    }

    /// Benchmarks at which a cycle was cut
    pub fn cycles(&self) -> &[String] {
        &self.cycles
    }

    pub fn into_parts(self) -> (HashMap<String, BenchmarkMetadata>, Vec<String>) {
        (self.cache, self.cycles)
    }
}

/// Resolve every benchmark in the catalog and store the result on it
pub fn resolve_catalog_metadata(catalog: &mut Catalog) {
    let (mut resolved, cycles) = {
        let mut resolver = MetadataResolver::new(&*catalog);
        for benchmark in catalog.benchmarks() {
            resolver.resolve(&benchmark.id);
        }
        resolver.into_parts()
    };

    for benchmark in catalog.benchmarks_mut() {
        if let Some(metadata) = resolved.remove(&benchmark.id) {
            benchmark.metadata = metadata;
        }
    }
    catalog.report_mut().cycles.extend(cycles);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    /// In-memory graph that counts direct-metadata lookups per benchmark
    #[derive(Default)]
    struct CountingSource {
        children: HashMap<String, Vec<String>>,
        direct: HashMap<String, BenchmarkMetadata>,
        calls: RefCell<HashMap<String, usize>>,
    }

    impl CountingSource {
        fn edge(mut self, parent: &str, children: &[&str]) -> Self {
            self.children.insert(
                parent.to_string(),
                children.iter().map(|c| c.to_string()).collect(),
            );
            self
        }

        fn control(mut self, benchmark: &str, control: &str, tables: &[&str]) -> Self {
            let entry = self.direct.entry(benchmark.to_string()).or_default();
            entry.controls.insert(control.to_string());
            if let Some(first) = tables.first() {
                entry.primary_tables.insert(first.to_string());
            }
            entry.list_of_tables.extend(tables.iter().map(|t| t.to_string()));
            self
        }

        fn calls(&self, id: &str) -> usize {
            self.calls.borrow().get(id).copied().unwrap_or(0)
        }
    }

    impl MetadataSource for CountingSource {
        fn child_ids(&self, benchmark_id: &str) -> Vec<String> {
            self.children.get(benchmark_id).cloned().unwrap_or_default()
        }

        fn direct_metadata(&self, benchmark_id: &str) -> BenchmarkMetadata {
            *self.calls.borrow_mut().entry(benchmark_id.to_string()).or_default() += 1;
            self.direct.get(benchmark_id).cloned().unwrap_or_default()
        }
    }

    fn diamond() -> CountingSource {
        CountingSource::default()
            .edge("A", &["B", "C"])
            .edge("B", &["D"])
            .edge("C", &["D"])
            .control("D", "K", &["T"])
    }

    #[test]
    fn test_diamond_reports_each_item_once() {
        let source = diamond();
        let mut resolver = MetadataResolver::new(&source);
        let a = resolver.resolve("A");

        assert_eq!(a.controls.iter().collect::<Vec<_>>(), vec!["K"]);
        assert_eq!(a.list_of_tables.iter().collect::<Vec<_>>(), vec!["T"]);
        assert_eq!(a.primary_tables.iter().collect::<Vec<_>>(), vec!["T"]);
    }

    #[test]
    fn test_shared_child_resolved_once() {
        let source = diamond();
        let mut resolver = MetadataResolver::new(&source);
        resolver.resolve("A");

        let via_b = resolver.resolve("D");
        assert_eq!(resolver.cached("B").unwrap(), &via_b);
        assert_eq!(resolver.cached("C").unwrap(), &via_b);
        assert_eq!(via_b.to_json().unwrap(), resolver.cached("D").unwrap().to_json().unwrap());

        for id in ["A", "B", "C", "D"] {
            assert_eq!(source.calls(id), 1, "benchmark {} resolved more than once", id);
        }
    }

    #[test]
    fn test_deep_sharing_stays_linear() {
        // Each level points at both nodes of the next: 2^depth paths, 2 * depth nodes.
        let depth = 24;
        let mut source = CountingSource::default();
        for level in 0..depth {
            let next = [format!("l{}a", level + 1), format!("l{}b", level + 1)];
            let next: Vec<&str> = next.iter().map(String::as_str).collect();
            source = source
                .edge(&format!("l{}a", level), &next)
                .edge(&format!("l{}b", level), &next);
        }
        source = source.control(&format!("l{}a", depth), "leaf", &["t"]);

        let mut resolver = MetadataResolver::new(&source);
        let top = resolver.resolve("l0a");
        assert!(top.controls.contains("leaf"));
        assert!(source.calls.borrow().values().all(|n| *n == 1));
    }

    #[test]
    fn test_cycle_is_cut() {
        let source = CountingSource::default()
            .edge("A", &["B"])
            .edge("B", &["A"])
            .control("A", "ka", &[])
            .control("B", "kb", &[]);

        let mut resolver = MetadataResolver::new(&source);
        let a = resolver.resolve("A");
        assert_eq!(a.controls.len(), 2);
        assert_eq!(resolver.cycles(), &["A".to_string()]);
    }
}
