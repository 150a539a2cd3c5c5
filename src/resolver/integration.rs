//! Bottom-up integration types for benchmarks that declare none

use crate::catalog::Catalog;
use crate::model::BenchmarkIdx;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Fill every benchmark without declared integration types with the union
/// of its controls' types and its children's effective types.
pub fn fill_integration_types(catalog: &mut Catalog) {
    let mut memo: HashMap<BenchmarkIdx, BTreeSet<String>> = HashMap::new();
    let mut in_progress: HashSet<BenchmarkIdx> = HashSet::new();

    for i in 0..catalog.benchmarks().len() {
        effective_types(catalog, BenchmarkIdx(i), &mut memo, &mut in_progress);
    }

    for (i, benchmark) in catalog.benchmarks_mut().iter_mut().enumerate() {
        if benchmark.integration_types.is_empty() {
            if let Some(types) = memo.remove(&BenchmarkIdx(i)) {
                benchmark.integration_types = types;
            }
        }
    }
}

fn effective_types(
    catalog: &Catalog,
    idx: BenchmarkIdx,
    memo: &mut HashMap<BenchmarkIdx, BTreeSet<String>>,
    in_progress: &mut HashSet<BenchmarkIdx>,
) -> BTreeSet<String> {
    if let Some(types) = memo.get(&idx) {
        return types.clone();
    }

    let benchmark = catalog.benchmark_at(idx);
    if !benchmark.integration_types.is_empty() {
        memo.insert(idx, benchmark.integration_types.clone());
        return benchmark.integration_types.clone();
    }
    if !in_progress.insert(idx) {
        return BTreeSet::new();
    }

    let mut types: BTreeSet<String> = benchmark
        .control_refs
        .iter()
        .flat_map(|c| catalog.control_at(*c).integration_types.iter().cloned())
        .collect();
    for child in &benchmark.child_refs {
        types.extend(effective_types(catalog, *child, memo, in_progress));
    }

    in_progress.remove(&idx);
    memo.insert(idx, types.clone());
    types
}

#[cfg(test)]
mod tests {
    use crate::config::BenchsyncConfig;
    use crate::loader::CatalogBuilder;
    use crate::model::{Benchmark, Control};

    #[test]
    fn test_declared_types_are_kept_and_missing_filled() {
        let mut builder = CatalogBuilder::new(&BenchsyncConfig::default()).unwrap();
        builder.add_control(Control::new("k_aws", "AWS").with_integration_type("aws"));
        builder.add_control(Control::new("k_azure", "Azure").with_integration_type("azure"));

        let mut declared = Benchmark::new("declared", "Declared").with_controls(["k_azure"]);
        declared.integration_types.insert("gcp".to_string());

        builder.add_benchmark(Benchmark::new("top", "Top").with_children(["mid", "declared"]));
        builder.add_benchmark(Benchmark::new("mid", "Mid").with_controls(["k_aws"]));
        builder.add_benchmark(declared);

        // finish() runs the fill
        let catalog = builder.finish().unwrap();
        let types = |id: &str| {
            catalog
                .benchmark(id)
                .unwrap()
                .integration_types
                .iter()
                .cloned()
                .collect::<Vec<_>>()
        };

        assert_eq!(types("mid"), vec!["aws"]);
        assert_eq!(types("declared"), vec!["gcp"]);
        assert_eq!(types("top"), vec!["aws", "gcp"]);
    }
}
