//! Benchmark loading and the second-pass link resolution

use super::builder::{read_definition, CatalogBuilder};
use super::de::{null_as_default, one_or_many};
use super::report::UnresolvedLink;
use crate::ignore::IgnoreFilter;
use crate::model::tag::deserialize_tags;
use crate::model::{Benchmark, BenchmarkIdx, ControlIdx, TagMap};
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct BenchmarkFile {
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    section_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    children: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    controls: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_tags")]
    tags: TagMap,
    #[serde(default)]
    auto_assign: Option<bool>,
    #[serde(default)]
    tracks_drift_events: bool,
    #[serde(default, alias = "integration_types", deserialize_with = "one_or_many")]
    integration_type: Vec<String>,
}

impl From<BenchmarkFile> for Benchmark {
    fn from(file: BenchmarkFile) -> Self {
        let mut benchmark = Benchmark::new(file.id, file.title)
            .with_children(file.children)
            .with_controls(file.controls);
        benchmark.section_code = file.section_code;
        benchmark.description = file.description;
        benchmark.tags = file.tags;
        benchmark.auto_assign = file.auto_assign.unwrap_or(false);
        benchmark.tracks_drift_events = file.tracks_drift_events;
        benchmark.integration_types = file.integration_type.into_iter().collect();
        benchmark
    }
}

impl CatalogBuilder {
    /// Load every benchmark file under `dir`. Links are resolved later.
    pub fn load_benchmarks(&mut self, dir: &Path, filter: &IgnoreFilter) -> Result<()> {
        for path in self.definition_files(dir, filter)? {
            let file: BenchmarkFile = read_definition(&path)?;
            self.report.benchmark_files += 1;
            debug!(
                "Loading benchmark {} ({} children, {} controls) from {}",
                file.id,
                file.children.len(),
                file.controls.len(),
                path.display()
            );
            self.benchmarks.push((path, file.into()));
        }
        Ok(())
    }

    /// Queue a benchmark built in memory
    pub fn add_benchmark(&mut self, benchmark: Benchmark) {
        self.benchmarks.push((PathBuf::from("<memory>"), benchmark));
    }

    /// Second pass: enforce unique ids and resolve declared links to arena indices.
    pub(super) fn link_benchmarks(
        &mut self,
    ) -> Result<(Vec<Benchmark>, HashMap<String, BenchmarkIdx>)> {
        let mut index: HashMap<String, BenchmarkIdx> = HashMap::with_capacity(self.benchmarks.len());
        let mut origins: Vec<PathBuf> = Vec::with_capacity(self.benchmarks.len());
        let mut benchmarks: Vec<Benchmark> = Vec::with_capacity(self.benchmarks.len());

        for (path, benchmark) in std::mem::take(&mut self.benchmarks) {
            if let Some(existing) = index.get(&benchmark.id) {
                return Err(Error::DuplicateBenchmark {
                    id: benchmark.id,
                    first: origins[existing.0].clone(),
                    second: path,
                });
            }
            index.insert(benchmark.id.clone(), BenchmarkIdx(benchmarks.len()));
            origins.push(path);
            benchmarks.push(benchmark);
        }

        for benchmark in &mut benchmarks {
            let mut child_refs = Vec::with_capacity(benchmark.children.len());
            for child in &benchmark.children {
                match index.get(child) {
                    Some(idx) if !child_refs.contains(idx) => child_refs.push(*idx),
                    Some(_) => {}
                    None => {
                        warn!("Benchmark {} references unknown child {}", benchmark.id, child);
                        self.report.unresolved_children.push(UnresolvedLink {
                            benchmark_id: benchmark.id.clone(),
                            target_id: child.clone(),
                        });
                    }
                }
            }

            let mut control_refs: Vec<ControlIdx> = Vec::with_capacity(benchmark.controls.len());
            for control in &benchmark.controls {
                match self.control_index.get(control) {
                    Some(idx) if !control_refs.contains(idx) => control_refs.push(*idx),
                    Some(_) => {}
                    None => {
                        warn!("Benchmark {} references unknown control {}", benchmark.id, control);
                        self.report.unresolved_controls.push(UnresolvedLink {
                            benchmark_id: benchmark.id.clone(),
                            target_id: control.clone(),
                        });
                    }
                }
            }

            benchmark.child_refs = child_refs;
            benchmark.control_refs = control_refs;
        }

        Ok((benchmarks, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BenchsyncConfig;
    use crate::model::Control;
    use std::fs;

    #[test]
    fn test_null_lists_and_defaults() {
        let file: BenchmarkFile = serde_yaml::from_str(
            "id: cis_v1\ntitle: CIS\nsection_code: '1'\nchildren:\ncontrols: ~\ntags:\n  family: cis\n",
        )
        .unwrap();

        let benchmark: Benchmark = file.into();
        assert!(benchmark.children.is_empty());
        assert!(benchmark.controls.is_empty());
        assert!(!benchmark.auto_assign);
        assert_eq!(benchmark.section_code, "1");
        assert_eq!(benchmark.tags["family"], vec!["cis"]);
    }

    #[test]
    fn test_links_resolve_across_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a_parent.yaml"), "id: parent\nchildren: [child, ghost]\ncontrols: [c1, c1, c9]\n").unwrap();
        fs::write(dir.path().join("z_child.yaml"), "id: child\ncontrols: [c1]\n").unwrap();

        let mut builder = CatalogBuilder::new(&BenchsyncConfig::default()).unwrap();
        builder.add_control(Control::new("c1", "One"));
        builder
            .load_benchmarks(dir.path(), &IgnoreFilter::new(dir.path(), None))
            .unwrap();

        let (benchmarks, index) = builder.link_benchmarks().unwrap();
        let parent = &benchmarks[index["parent"].0];
        assert_eq!(parent.child_refs, vec![index["child"]]);
        assert_eq!(parent.control_refs, vec![ControlIdx(0)]);

        let unresolved: Vec<&str> = builder
            .report
            .unresolved_children
            .iter()
            .map(|l| l.target_id.as_str())
            .collect();
        assert_eq!(unresolved, vec!["ghost"]);
        assert_eq!(builder.report.unresolved_controls[0].target_id, "c9");
    }

    #[test]
    fn test_duplicate_benchmark_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one.yaml"), "id: cis\ntitle: One\n").unwrap();
        fs::write(dir.path().join("two.yaml"), "id: cis\ntitle: Two\n").unwrap();

        let mut builder = CatalogBuilder::new(&BenchsyncConfig::default()).unwrap();
        builder
            .load_benchmarks(dir.path(), &IgnoreFilter::new(dir.path(), None))
            .unwrap();

        match builder.link_benchmarks() {
            Err(Error::DuplicateBenchmark { id, first, second }) => {
                assert_eq!(id, "cis");
                assert!(first.ends_with("one.yaml"));
                assert!(second.ends_with("two.yaml"));
            }
            other => panic!("expected duplicate benchmark error, got {:?}", other.map(|_| ())),
        }
    }
}
