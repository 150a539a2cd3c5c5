//! What a synchronization run wrote, skipped and excluded

use super::pipeline::SyncOptions;
use crate::loader::LoadReport;
use crate::storage::OwnedTable;
use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Row outcomes for one table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableOutcome {
    /// Rows inserted, or updated under upsert
    pub written: usize,
    /// Rows that already existed and were left untouched
    pub skipped: usize,
    /// Rows whose insert failed
    pub failed: usize,
}

/// A control dropped because its query was not persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingQuery {
    pub control_id: String,
    pub query_id: String,
}

/// A link row not written because its target was not persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedLink {
    pub table: OwnedTable,
    pub owner_id: String,
    pub target_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub options: SyncOptions,
    pub load: LoadReport,
    pub tables: BTreeMap<OwnedTable, TableOutcome>,
    pub missing_queries: Vec<MissingQuery>,
    pub dropped_links: Vec<DroppedLink>,
    /// Per-row failures, one line each
    pub warnings: Vec<String>,
}

impl SyncReport {
    pub fn new(options: SyncOptions, load: LoadReport) -> Self {
        Self {
            options,
            load,
            tables: BTreeMap::new(),
            missing_queries: Vec::new(),
            dropped_links: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Count an insert result. Returns whether the row is now present.
    pub(crate) fn record(&mut self, table: OwnedTable, key: &str, result: Result<bool>) -> bool {
        let outcome = self.tables.entry(table).or_default();
        match result {
            Ok(true) => {
                outcome.written += 1;
                true
            }
            Ok(false) => {
                outcome.skipped += 1;
                true
            }
            Err(e) => {
                outcome.failed += 1;
                warn!("Failed to write {} row {}: {}", table, key, e);
                self.warnings.push(format!("{} {}: {}", table, key, e));
                false
            }
        }
    }

    pub(crate) fn drop_link(&mut self, table: OwnedTable, owner_id: &str, target_id: &str) {
        self.dropped_links.push(DroppedLink {
            table,
            owner_id: owner_id.to_string(),
            target_id: target_id.to_string(),
        });
    }

    pub fn outcome(&self, table: OwnedTable) -> TableOutcome {
        self.tables.get(&table).copied().unwrap_or_default()
    }

    /// Controls left out because their query was not persisted
    pub fn skipped_controls(&self) -> impl Iterator<Item = &str> {
        self.missing_queries.iter().map(|m| m.control_id.as_str())
    }

    pub fn failed_rows(&self) -> usize {
        self.tables.values().map(|o| o.failed).sum()
    }

    pub fn has_warnings(&self) -> bool {
        !self.missing_queries.is_empty()
            || !self.dropped_links.is_empty()
            || !self.warnings.is_empty()
            || !self.load.is_clean()
    }
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Sync Report (write mode: {}, clear scope: {}):",
            self.options.write_mode, self.options.clear_scope
        )?;
        for (table, outcome) in &self.tables {
            writeln!(
                f,
                "  {}: {} written, {} skipped, {} failed",
                table, outcome.written, outcome.skipped, outcome.failed
            )?;
        }
        for missing in &self.missing_queries {
            writeln!(f, "  Missing query: {} (control {})", missing.query_id, missing.control_id)?;
        }
        for link in &self.dropped_links {
            writeln!(f, "  Dropped {} link: {} -> {}", link.table, link.owner_id, link.target_id)?;
        }
        for warning in &self.warnings {
            writeln!(f, "  Warning: {}", warning)?;
        }
        Ok(())
    }
}
