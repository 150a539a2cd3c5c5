//! `CatalogBuilder` - loader state for a single invocation

use super::enrichment::Enrichment;
use super::report::LoadReport;
use super::walk::walk_files;
use crate::catalog::Catalog;
use crate::config::BenchsyncConfig;
use crate::ignore::IgnoreFilter;
use crate::model::{Benchmark, Control, ControlIdx, Query, QueryView};
use crate::resolver;
use crate::sql::{ParseError, TableExtractor};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A standalone query whose SQL did not parse. Fatal only once a control needs it.
#[derive(Debug)]
pub(super) struct DeferredFailure {
    pub path: PathBuf,
    pub error: ParseError,
}

/// Accumulates definitions from one configuration tree and produces a `Catalog`.
///
/// All state is owned by the builder; nothing is shared between invocations.
pub struct CatalogBuilder {
    pub(super) config: BenchsyncConfig,
    pub(super) extractor: TableExtractor,
    pub(super) enrichment: Enrichment,
    pub(super) queries: BTreeMap<String, Query>,
    pub(super) deferred: BTreeMap<String, DeferredFailure>,
    pub(super) controls: Vec<Control>,
    pub(super) control_index: HashMap<String, ControlIdx>,
    /// Benchmarks with the file they came from, linked in `finish`
    pub(super) benchmarks: Vec<(PathBuf, Benchmark)>,
    pub(super) views: Vec<QueryView>,
    pub(super) report: LoadReport,
}

impl CatalogBuilder {
    /// Fails if the configured SQL dialect is unknown
    pub fn new(config: &BenchsyncConfig) -> Result<Self> {
        Ok(Self {
            extractor: TableExtractor::new(&config.sql_dialect)?,
            config: config.clone(),
            enrichment: Enrichment::new(),
            queries: BTreeMap::new(),
            deferred: BTreeMap::new(),
            controls: Vec::new(),
            control_index: HashMap::new(),
            benchmarks: Vec::new(),
            views: Vec::new(),
            report: LoadReport::default(),
        })
    }

    /// Use an already-built enrichment mapping. Must precede control loading.
    pub fn with_enrichment(mut self, enrichment: Enrichment) -> Self {
        self.enrichment.merge(enrichment);
        self
    }

    /// Load a whole configuration tree and resolve it
    pub fn load(mut self, root: &Path) -> Result<Catalog> {
        if !root.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("configuration root {} is not a directory", root.display()),
            )));
        }

        info!("Loading configuration tree from {}", root.display());
        let filter = IgnoreFilter::new(root, Some(&self.config.exclude));
        let layout = self.config.layout.clone();

        let enrichment = Enrichment::load(&root.join(&layout.enrichment), &filter)?;
        self.enrichment.merge(enrichment);

        self.load_queries(&root.join(&layout.queries), &filter)?;
        self.load_controls(&root.join(&layout.controls), &filter)?;
        self.load_views(&root.join(&layout.query_views), &filter)?;
        self.load_benchmarks(&root.join(&layout.benchmarks), &filter)?;

        self.finish()
    }

    /// Check deferred failures, link benchmarks and derive everything computed.
    pub fn finish(mut self) -> Result<Catalog> {
        for (query_id, failure) in std::mem::take(&mut self.deferred) {
            let referenced = self
                .controls
                .iter()
                .any(|c| c.query_id.as_deref() == Some(query_id.as_str()));
            if referenced {
                return Err(Error::Sql {
                    query_id,
                    source: failure.error,
                });
            }
            warn!(
                "Dropping unreferenced query {} from {}: {}",
                query_id,
                failure.path.display(),
                failure.error
            );
            self.report.dropped_queries.push(query_id);
        }

        let (benchmarks, benchmark_index) = self.link_benchmarks()?;
        self.report.enrichment_entries = self.enrichment.len();

        let mut catalog = Catalog::from_parts(
            self.queries,
            self.controls,
            self.control_index,
            benchmarks,
            benchmark_index,
            self.views,
            self.report,
        );

        resolver::fill_integration_types(&mut catalog);
        resolver::resolve_catalog_metadata(&mut catalog);

        let stats = catalog.stats();
        info!(
            "Loaded {} queries, {} controls, {} benchmarks, {} query views ({} warnings)",
            stats.queries, stats.controls, stats.benchmarks, stats.views, stats.warnings
        );
        Ok(catalog)
    }

    pub(super) fn definition_files(&self, dir: &Path, filter: &IgnoreFilter) -> Result<Vec<PathBuf>> {
        let files = walk_files(dir, filter, |p| self.config.is_definition_file(p))?;
        debug!("Found {} definition files in {}", files.len(), dir.display());
        Ok(files)
    }
}

/// Read and deserialize one YAML definition file
pub(super) fn read_definition<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&contents).map_err(|source| Error::Definition {
        path: path.to_path_buf(),
        source,
    })
}
