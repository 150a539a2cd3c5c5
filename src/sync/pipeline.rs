//! Synchronization pipeline - a resolved `Catalog` into the relational store
//!
//! Steps run in a fixed order, each in its own transaction:
//! clear → queries → controls → control tags → benchmarks → query views.
//! A row is only linked to once its target was persisted in an earlier step.

use super::report::{MissingQuery, SyncReport};
use crate::catalog::Catalog;
use crate::model::tag::tags_of;
use crate::storage::{ClearScope, OwnedTable, SqliteStore, WriteMode};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SyncStep {
    Clear,
    Queries,
    Controls,
    ControlTags,
    Benchmarks,
    QueryViews,
}

impl SyncStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStep::Clear => "clear",
            SyncStep::Queries => "queries",
            SyncStep::Controls => "controls",
            SyncStep::ControlTags => "control-tags",
            SyncStep::Benchmarks => "benchmarks",
            SyncStep::QueryViews => "query-views",
        }
    }
}

impl std::fmt::Display for SyncStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    pub write_mode: WriteMode,
    pub clear_scope: ClearScope,
}

pub struct SyncPipeline<'a> {
    store: &'a mut SqliteStore,
    options: SyncOptions,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> SyncPipeline<'a> {
    pub fn new(store: &'a mut SqliteStore, options: SyncOptions) -> Self {
        Self {
            store,
            options,
            cancel: None,
        }
    }

    /// Check `flag` before each step; once set, the run stops with `Error::Cancelled`
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn run(mut self, catalog: &Catalog) -> Result<SyncReport> {
        let SyncOptions {
            write_mode: mode,
            clear_scope: scope,
        } = self.options;
        let mut report = SyncReport::new(self.options, catalog.report().clone());

        self.checkpoint(SyncStep::Clear)?;
        self.store.with_transaction(|store| store.clear(scope))?;

        self.checkpoint(SyncStep::Queries)?;
        let queries = self
            .store
            .with_transaction(|store| Ok(insert_queries(store, catalog, mode, &mut report)))?;

        self.checkpoint(SyncStep::Controls)?;
        let controls = self
            .store
            .with_transaction(|store| Ok(insert_controls(store, catalog, mode, &queries, &mut report)))?;

        self.checkpoint(SyncStep::ControlTags)?;
        self.store.with_transaction(|store| {
            insert_control_tags(store, catalog, mode, &controls, &mut report);
            Ok(())
        })?;

        self.checkpoint(SyncStep::Benchmarks)?;
        self.store.with_transaction(|store| {
            insert_benchmarks(store, catalog, mode, &controls, &mut report);
            Ok(())
        })?;

        self.checkpoint(SyncStep::QueryViews)?;
        self.store.with_transaction(|store| {
            insert_query_views(store, catalog, mode, &queries, &mut report);
            Ok(())
        })?;

        if !report.missing_queries.is_empty() {
            let ids: Vec<&str> = report.skipped_controls().collect();
            warn!(
                "{} controls skipped because their query was not synchronized: {}",
                ids.len(),
                ids.join(", ")
            );
        }
        info!("Synchronization complete ({} failed rows)", report.failed_rows());
        Ok(report)
    }

    fn checkpoint(&self, step: SyncStep) -> Result<()> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::SeqCst) {
                warn!("Synchronization cancelled before step {}", step);
                return Err(Error::Cancelled(step));
            }
        }
        info!("Sync step: {}", step);
        Ok(())
    }
}

/// Returns the ids of queries now present in the store
fn insert_queries(
    store: &SqliteStore,
    catalog: &Catalog,
    mode: WriteMode,
    report: &mut SyncReport,
) -> HashSet<String> {
    let mut present = HashSet::new();
    for query in catalog.queries() {
        if !report.record(OwnedTable::Queries, &query.id, store.insert_query(query, mode)) {
            continue;
        }
        present.insert(query.id.clone());

        for parameter in &query.parameters {
            let key = format!("{}/{}", query.id, parameter.key);
            report.record(
                OwnedTable::QueryParameters,
                &key,
                store.insert_query_parameter(&query.id, parameter, mode),
            );
        }
    }
    present
}

/// Returns the ids of controls now present in the store
fn insert_controls(
    store: &SqliteStore,
    catalog: &Catalog,
    mode: WriteMode,
    queries: &HashSet<String>,
    report: &mut SyncReport,
) -> HashSet<String> {
    let mut present = HashSet::new();
    for control in catalog.controls() {
        if let Some(query_id) = &control.query_id {
            if !queries.contains(query_id) {
                report.missing_queries.push(MissingQuery {
                    control_id: control.id.clone(),
                    query_id: query_id.clone(),
                });
                continue;
            }
        }

        if report.record(OwnedTable::Controls, &control.id, store.insert_control(control, mode)) {
            present.insert(control.id.clone());
        }
    }
    present
}

fn insert_control_tags(
    store: &SqliteStore,
    catalog: &Catalog,
    mode: WriteMode,
    controls: &HashSet<String>,
    report: &mut SyncReport,
) {
    for control in catalog.controls().iter().filter(|c| controls.contains(&c.id)) {
        for tag in tags_of(&control.tags) {
            let key = format!("{}/{}", control.id, tag.key);
            report.record(
                OwnedTable::ControlTags,
                &key,
                store.insert_control_tag(&control.id, &tag, mode),
            );
        }
    }
}

fn insert_benchmarks(
    store: &SqliteStore,
    catalog: &Catalog,
    mode: WriteMode,
    controls: &HashSet<String>,
    report: &mut SyncReport,
) {
    let mut present = HashSet::new();
    for benchmark in catalog.benchmarks() {
        if report.record(OwnedTable::Benchmarks, &benchmark.id, store.insert_benchmark(benchmark, mode)) {
            present.insert(benchmark.id.as_str());
        }
    }

    for benchmark in catalog.benchmarks().iter().filter(|b| present.contains(b.id.as_str())) {
        for tag in tags_of(&benchmark.tags) {
            let key = format!("{}/{}", benchmark.id, tag.key);
            report.record(
                OwnedTable::BenchmarkTags,
                &key,
                store.insert_benchmark_tag(&benchmark.id, &tag, mode),
            );
        }

        for child_idx in &benchmark.child_refs {
            let child = &catalog.benchmark_at(*child_idx).id;
            if !present.contains(child.as_str()) {
                report.drop_link(OwnedTable::BenchmarkChildren, &benchmark.id, child);
                continue;
            }
            let key = format!("{}/{}", benchmark.id, child);
            report.record(
                OwnedTable::BenchmarkChildren,
                &key,
                store.insert_benchmark_child(&benchmark.id, child),
            );
        }

        for control_idx in &benchmark.control_refs {
            let control = &catalog.control_at(*control_idx).id;
            if !controls.contains(control) {
                report.drop_link(OwnedTable::BenchmarkControls, &benchmark.id, control);
                continue;
            }
            let key = format!("{}/{}", benchmark.id, control);
            report.record(
                OwnedTable::BenchmarkControls,
                &key,
                store.insert_benchmark_control(&benchmark.id, control),
            );
        }
    }
}

fn insert_query_views(
    store: &SqliteStore,
    catalog: &Catalog,
    mode: WriteMode,
    queries: &HashSet<String>,
    report: &mut SyncReport,
) {
    let mut present = HashSet::new();
    for view in catalog.views() {
        if !queries.contains(&view.query_id) {
            report.drop_link(OwnedTable::QueryViews, &view.id, &view.query_id);
            continue;
        }
        if report.record(OwnedTable::QueryViews, &view.id, store.insert_query_view(view, mode)) {
            present.insert(view.id.as_str());
        }
    }

    for view in catalog.views().iter().filter(|v| present.contains(v.id.as_str())) {
        for dependency in &view.dependencies {
            if !queries.contains(dependency) && !present.contains(dependency.as_str()) {
                report.drop_link(OwnedTable::QueryViewDependencies, &view.id, dependency);
                continue;
            }
            let key = format!("{}/{}", view.id, dependency);
            report.record(
                OwnedTable::QueryViewDependencies,
                &key,
                store.insert_query_view_dependency(&view.id, dependency),
            );
        }
    }
}
