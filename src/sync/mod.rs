//! Synchronization - load a configuration tree and make it durable
//!
//! - `pipeline`: step-ordered, conflict-tolerant inserts from a `Catalog`
//! - `report`: per-table counts, missing queries and dropped links
//! - `coordinator`: single-flight guard and step-boundary cancellation

pub mod coordinator;
pub mod pipeline;
pub mod report;

pub use crate::storage::{ClearScope, WriteMode};
pub use coordinator::{RunGuard, SyncCoordinator};
pub use pipeline::{SyncOptions, SyncPipeline, SyncStep};
pub use report::{DroppedLink, MissingQuery, SyncReport, TableOutcome};

use crate::config::BenchsyncConfig;
use crate::storage::SqliteStore;
use crate::Result;
use std::path::Path;

/// Load the tree at `root` and synchronize it into `store`, one run per process at a time.
pub fn sync(root: &Path, store: &mut SqliteStore, config: &BenchsyncConfig) -> Result<SyncReport> {
    SyncCoordinator::global().run(root, store, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::OwnedTable;
    use crate::Error;
    use std::fs;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn tree(root: &Path, title: &str) {
        write(
            root,
            "controls/c1.yaml",
            &format!("id: c1\ntitle: {}\nquery:\n  query_to_execute: SELECT * FROM t1\n", title),
        );
        write(root, "benchmarks/b1.yaml", "id: b1\ntitle: B1\ncontrols: [c1]\ntags:\n  family: cis\n");
    }

    fn config_with(write_mode: WriteMode, clear_scope: ClearScope) -> BenchsyncConfig {
        BenchsyncConfig {
            write_mode,
            clear_scope,
            ..BenchsyncConfig::default()
        }
    }

    #[test]
    fn test_duplicate_benchmark_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        tree(dir.path(), "One");
        write(dir.path(), "benchmarks/zz_again.yaml", "id: b1\ntitle: Again\n");

        let coordinator = SyncCoordinator::new();
        let mut store = SqliteStore::open_in_memory().unwrap();
        let result = coordinator.run(dir.path(), &mut store, &BenchsyncConfig::default());

        assert!(matches!(result, Err(Error::DuplicateBenchmark { id, .. }) if id == "b1"));
        assert_eq!(store.stats().unwrap().total(), 0);
        assert!(!coordinator.is_running());
    }

    #[test]
    fn test_insert_skip_keeps_stale_title() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = SyncCoordinator::new();
        let mut store = SqliteStore::open_in_memory().unwrap();
        let config = config_with(WriteMode::InsertSkip, ClearScope::LinksOnly);

        tree(dir.path(), "Original");
        coordinator.run(dir.path(), &mut store, &config).unwrap();
        let counts = store.stats().unwrap().tables;

        tree(dir.path(), "Renamed");
        let report = coordinator.run(dir.path(), &mut store, &config).unwrap();

        assert_eq!(store.stats().unwrap().tables, counts);
        assert_eq!(store.get_control("c1").unwrap().unwrap().title, "Original");
        assert_eq!(report.outcome(OwnedTable::Controls).skipped, 1);
    }

    #[test]
    fn test_upsert_refreshes_title() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = SyncCoordinator::new();
        let mut store = SqliteStore::open_in_memory().unwrap();
        let config = config_with(WriteMode::Upsert, ClearScope::LinksOnly);

        tree(dir.path(), "Original");
        coordinator.run(dir.path(), &mut store, &config).unwrap();
        tree(dir.path(), "Renamed");
        coordinator.run(dir.path(), &mut store, &config).unwrap();

        assert_eq!(store.get_control("c1").unwrap().unwrap().title, "Renamed");
        assert_eq!(store.count(OwnedTable::Controls).unwrap(), 1);
    }

    #[test]
    fn test_full_replace_refreshes_title() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open_in_memory().unwrap();

        tree(dir.path(), "Original");
        sync(dir.path(), &mut store, &BenchsyncConfig::default()).unwrap();
        tree(dir.path(), "Renamed");
        let report = sync(dir.path(), &mut store, &BenchsyncConfig::default()).unwrap();

        assert_eq!(store.get_control("c1").unwrap().unwrap().title, "Renamed");
        assert_eq!(store.get_benchmark_controls("b1").unwrap(), vec!["c1"]);
        assert_eq!(report.outcome(OwnedTable::BenchmarkTags).written, 1);
        assert!(!report.has_warnings());
    }
}
