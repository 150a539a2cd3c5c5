//! SQLite storage implementation

use super::mode::{ClearScope, WriteMode};
use super::schema::{self, OwnedTable};
use crate::model::{
    Benchmark, BenchmarkMetadata, Control, Query, QueryParameter, QueryView, Severity, Tag, TagMap,
};
use crate::Result;
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::warn;

/// SQLite-backed storage for the synchronized configuration dataset
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Run an insert under the given write mode.
    /// Returns `false` when an existing row was left untouched.
    fn write_row(
        &self,
        table: OwnedTable,
        columns: &[&str],
        key: &[&str],
        mode: WriteMode,
        values: &[&dyn ToSql],
    ) -> Result<bool> {
        let sql = insert_sql(table, columns, key, mode);
        let changed = self.conn.prepare_cached(&sql)?.execute(values)?;
        Ok(changed > 0)
    }

    // ========== Query Operations ==========

    /// Insert a query row. Parameters are written separately.
    pub fn insert_query(&self, query: &Query, mode: WriteMode) -> Result<bool> {
        let list_of_tables = serde_json::to_string(&query.list_of_tables)?;
        let integration_types = serde_json::to_string(&query.integration_types)?;
        self.write_row(
            OwnedTable::Queries,
            &[
                "id",
                "engine",
                "query_to_execute",
                "primary_table",
                "list_of_tables",
                "global",
                "integration_types",
            ],
            &["id"],
            mode,
            params![
                query.id,
                query.engine,
                query.query_to_execute,
                query.primary_table,
                list_of_tables,
                query.global,
                integration_types,
            ],
        )
    }

    pub fn insert_query_parameter(
        &self,
        query_id: &str,
        parameter: &QueryParameter,
        mode: WriteMode,
    ) -> Result<bool> {
        self.write_row(
            OwnedTable::QueryParameters,
            &["query_id", "key", "required", "default_value"],
            &["query_id", "key"],
            mode,
            params![query_id, parameter.key, parameter.required, parameter.default_value],
        )
    }

    /// Get a query by id, with its parameters
    pub fn get_query(&self, id: &str) -> Result<Option<Query>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, engine, query_to_execute, primary_table, list_of_tables, global, integration_types
                 FROM queries WHERE id = ?1",
                [id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, bool>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, engine, sql, primary_table, tables, global, integration_types)) = row else {
            return Ok(None);
        };

        let mut query = Query::new(id, sql);
        query.engine = engine;
        query.primary_table = primary_table;
        query.list_of_tables = serde_json::from_str(&tables)?;
        query.global = global;
        query.integration_types = serde_json::from_str(&integration_types)?;
        query.parameters = self.get_query_parameters(&query.id)?;
        Ok(Some(query))
    }

    pub fn get_query_parameters(&self, query_id: &str) -> Result<Vec<QueryParameter>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, required, default_value FROM query_parameters WHERE query_id = ?1 ORDER BY key",
        )?;

        let parameters = stmt
            .query_map([query_id], |row| {
                Ok(QueryParameter {
                    key: row.get(0)?,
                    required: row.get(1)?,
                    default_value: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(parameters)
    }

    // ========== Control Operations ==========

    pub fn insert_control(&self, control: &Control, mode: WriteMode) -> Result<bool> {
        let integration_types = serde_json::to_string(&control.integration_types)?;
        self.write_row(
            OwnedTable::Controls,
            &[
                "id",
                "title",
                "description",
                "severity",
                "integration_types",
                "manual_verification",
                "managed",
                "enabled",
                "query_id",
            ],
            &["id"],
            mode,
            params![
                control.id,
                control.title,
                control.description,
                control.severity.as_str(),
                integration_types,
                control.manual_verification,
                control.managed,
                control.enabled,
                control.query_id,
            ],
        )
    }

    /// Insert one tag row; values are stored as a JSON array
    pub fn insert_control_tag(&self, control_id: &str, tag: &Tag, mode: WriteMode) -> Result<bool> {
        let value = serde_json::to_string(&tag.values)?;
        self.write_row(
            OwnedTable::ControlTags,
            &["key", "control_id", "value"],
            &["key", "control_id"],
            mode,
            params![tag.key, control_id, value],
        )
    }

    /// Get a control by id, with its tags
    pub fn get_control(&self, id: &str) -> Result<Option<Control>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, title, description, severity, integration_types, manual_verification, managed, enabled, query_id
                 FROM controls WHERE id = ?1",
                [id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, bool>(5)?,
                        row.get::<_, bool>(6)?,
                        row.get::<_, bool>(7)?,
                        row.get::<_, Option<String>>(8)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, title, description, severity, integration_types, manual, managed, enabled, query_id)) =
            row
        else {
            return Ok(None);
        };

        let mut control = Control::new(id, title);
        control.description = description;
        control.severity = severity.parse().unwrap_or_else(|_| {
            warn!("Stored control {} has unknown severity {}", control.id, severity);
            Severity::default()
        });
        control.integration_types = serde_json::from_str(&integration_types)?;
        control.manual_verification = manual;
        control.managed = managed;
        control.enabled = enabled;
        control.query_id = query_id;
        control.tags = self.get_control_tags(&control.id)?;
        Ok(Some(control))
    }

    pub fn get_control_tags(&self, control_id: &str) -> Result<TagMap> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM control_tags WHERE control_id = ?1 ORDER BY key")?;

        let rows = stmt
            .query_map([control_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut tags = TagMap::new();
        for (key, value) in rows {
            tags.insert(key, serde_json::from_str(&value)?);
        }
        Ok(tags)
    }

    // ========== Benchmark Operations ==========

    /// Insert a benchmark row, including its serialized metadata blob
    pub fn insert_benchmark(&self, benchmark: &Benchmark, mode: WriteMode) -> Result<bool> {
        let integration_types = serde_json::to_string(&benchmark.integration_types)?;
        let metadata = benchmark.metadata.to_json()?;
        self.write_row(
            OwnedTable::Benchmarks,
            &[
                "id",
                "title",
                "description",
                "section_code",
                "auto_assign",
                "tracks_drift_events",
                "integration_types",
                "metadata",
            ],
            &["id"],
            mode,
            params![
                benchmark.id,
                benchmark.title,
                benchmark.description,
                benchmark.section_code,
                benchmark.auto_assign,
                benchmark.tracks_drift_events,
                integration_types,
                metadata,
            ],
        )
    }

    pub fn insert_benchmark_tag(&self, benchmark_id: &str, tag: &Tag, mode: WriteMode) -> Result<bool> {
        let value = serde_json::to_string(&tag.values)?;
        self.write_row(
            OwnedTable::BenchmarkTags,
            &["key", "benchmark_id", "value"],
            &["key", "benchmark_id"],
            mode,
            params![tag.key, benchmark_id, value],
        )
    }

    /// Link a child benchmark. Junction rows never update.
    pub fn insert_benchmark_child(&self, benchmark_id: &str, child_id: &str) -> Result<bool> {
        self.write_row(
            OwnedTable::BenchmarkChildren,
            &["benchmark_id", "child_id"],
            &["benchmark_id", "child_id"],
            WriteMode::InsertSkip,
            params![benchmark_id, child_id],
        )
    }

    /// Link a member control. Junction rows never update.
    pub fn insert_benchmark_control(&self, benchmark_id: &str, control_id: &str) -> Result<bool> {
        self.write_row(
            OwnedTable::BenchmarkControls,
            &["benchmark_id", "control_id"],
            &["benchmark_id", "control_id"],
            WriteMode::InsertSkip,
            params![benchmark_id, control_id],
        )
    }

    pub fn get_benchmark_metadata(&self, id: &str) -> Result<Option<BenchmarkMetadata>> {
        let json: Option<String> = self
            .conn
            .query_row("SELECT metadata FROM benchmarks WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;

        json.map(|j| BenchmarkMetadata::from_json(&j)).transpose()
    }

    pub fn get_benchmark_children(&self, benchmark_id: &str) -> Result<Vec<String>> {
        self.linked_ids(
            "SELECT child_id FROM benchmark_children WHERE benchmark_id = ?1 ORDER BY child_id",
            benchmark_id,
        )
    }

    pub fn get_benchmark_controls(&self, benchmark_id: &str) -> Result<Vec<String>> {
        self.linked_ids(
            "SELECT control_id FROM benchmark_controls WHERE benchmark_id = ?1 ORDER BY control_id",
            benchmark_id,
        )
    }

    pub fn get_benchmark_tags(&self, benchmark_id: &str) -> Result<TagMap> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM benchmark_tags WHERE benchmark_id = ?1 ORDER BY key")?;

        let rows = stmt
            .query_map([benchmark_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut tags = TagMap::new();
        for (key, value) in rows {
            tags.insert(key, serde_json::from_str(&value)?);
        }
        Ok(tags)
    }

    fn linked_ids(&self, sql: &str, owner_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map([owner_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    // ========== Query View Operations ==========

    pub fn insert_query_view(&self, view: &QueryView, mode: WriteMode) -> Result<bool> {
        self.write_row(
            OwnedTable::QueryViews,
            &["id", "title", "description", "query_id"],
            &["id"],
            mode,
            params![view.id, view.title, view.description, view.query_id],
        )
    }

    pub fn insert_query_view_dependency(&self, view_id: &str, dependency_id: &str) -> Result<bool> {
        self.write_row(
            OwnedTable::QueryViewDependencies,
            &["view_id", "dependency_id"],
            &["view_id", "dependency_id"],
            WriteMode::InsertSkip,
            params![view_id, dependency_id],
        )
    }

    pub fn get_query_view_dependencies(&self, view_id: &str) -> Result<Vec<String>> {
        self.linked_ids(
            "SELECT dependency_id FROM query_view_dependencies WHERE view_id = ?1 ORDER BY dependency_id",
            view_id,
        )
    }

    // ========== Bulk Operations ==========

    /// Begin a transaction for bulk operations
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", [])?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&mut self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&mut self) -> Result<()> {
        self.conn.execute("ROLLBACK", [])?;
        Ok(())
    }

    /// Run `f` inside one transaction: committed on `Ok`, rolled back on `Err`.
    pub fn with_transaction<T>(&mut self, f: impl FnOnce(&SqliteStore) -> Result<T>) -> Result<T> {
        self.begin_transaction()?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.rollback() {
                    warn!("Rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    /// Delete prior-run rows. Children go before the rows they point at.
    pub fn clear(&self, scope: ClearScope) -> Result<()> {
        for table in OwnedTable::all().iter().rev() {
            if scope == ClearScope::All || table.is_link() {
                self.conn.execute(&format!("DELETE FROM {}", table.as_str()), [])?;
            }
        }
        Ok(())
    }

    pub fn count(&self, table: OwnedTable) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.as_str()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let mut tables = Vec::with_capacity(OwnedTable::all().len());
        for table in OwnedTable::all() {
            tables.push((*table, self.count(*table)?));
        }
        Ok(DbStats { tables })
    }

    /// Distinct table names referenced by stored queries
    pub fn referenced_tables(&self) -> Result<BTreeSet<String>> {
        let mut stmt = self.conn.prepare("SELECT list_of_tables FROM queries")?;
        let blobs = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut tables = BTreeSet::new();
        for blob in blobs {
            let list: Vec<String> = serde_json::from_str(&blob)?;
            tables.extend(list);
        }
        Ok(tables)
    }
}

/// Build an `INSERT ... ON CONFLICT` statement for the write mode
fn insert_sql(table: OwnedTable, columns: &[&str], key: &[&str], mode: WriteMode) -> String {
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");

    let updates: Vec<String> = columns
        .iter()
        .filter(|c| !key.contains(*c))
        .map(|c| format!("{c} = excluded.{c}"))
        .collect();

    let action = match mode {
        WriteMode::Upsert if !updates.is_empty() => format!("DO UPDATE SET {}", updates.join(", ")),
        _ => "DO NOTHING".to_string(),
    };

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) {}",
        table.as_str(),
        columns.join(", "),
        placeholders,
        key.join(", "),
        action
    )
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DbStats {
    /// Row count per owned table
    pub tables: Vec<(OwnedTable, usize)>,
}

impl DbStats {
    pub fn total(&self) -> usize {
        self.tables.iter().map(|(_, n)| n).sum()
    }
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        for (table, rows) in &self.tables {
            writeln!(f, "  {}: {}", table, rows)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_query(id: &str) -> Query {
        Query::new(id, "SELECT id FROM aws_s3_bucket")
            .with_tables(["aws_s3_bucket"])
            .with_parameter(QueryParameter {
                key: "region".to_string(),
                required: true,
                default_value: Some("us-east-1".to_string()),
            })
    }

    #[test]
    fn test_query_crud() {
        let store = SqliteStore::open_in_memory().unwrap();
        let query = sample_query("q1");

        assert!(store.insert_query(&query, WriteMode::InsertSkip).unwrap());
        for parameter in &query.parameters {
            store.insert_query_parameter(&query.id, parameter, WriteMode::InsertSkip).unwrap();
        }

        let retrieved = store.get_query("q1").unwrap().unwrap();
        assert_eq!(retrieved, query);
        assert!(store.get_query("missing").unwrap().is_none());
    }

    #[test]
    fn test_insert_skip_leaves_existing_row() {
        let store = SqliteStore::open_in_memory().unwrap();

        let first = Control::new("c1", "Original");
        let second = Control::new("c1", "Renamed");

        assert!(store.insert_control(&first, WriteMode::InsertSkip).unwrap());
        assert!(!store.insert_control(&second, WriteMode::InsertSkip).unwrap());
        assert_eq!(store.get_control("c1").unwrap().unwrap().title, "Original");

        assert!(store.insert_control(&second, WriteMode::Upsert).unwrap());
        assert_eq!(store.get_control("c1").unwrap().unwrap().title, "Renamed");
        assert_eq!(store.count(OwnedTable::Controls).unwrap(), 1);
    }

    #[test]
    fn test_control_tags_roundtrip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut control = Control::new("c1", "Encrypted").with_integration_type("aws");
        control.severity = Severity::High;
        control.tags.insert("category".to_string(), vec!["security".to_string(), "storage".to_string()]);

        store.insert_control(&control, WriteMode::InsertSkip).unwrap();
        for (key, values) in &control.tags {
            store
                .insert_control_tag(&control.id, &Tag::new(key.clone(), values.clone()), WriteMode::InsertSkip)
                .unwrap();
        }

        let retrieved = store.get_control("c1").unwrap().unwrap();
        assert_eq!(retrieved, control);
    }

    #[test]
    fn test_benchmark_links() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut benchmark = Benchmark::new("root", "Root");
        benchmark.metadata.controls.insert("c1".to_string());

        store.insert_benchmark(&benchmark, WriteMode::InsertSkip).unwrap();
        assert!(store.insert_benchmark_control("root", "c1").unwrap());
        assert!(!store.insert_benchmark_control("root", "c1").unwrap());
        store.insert_benchmark_child("root", "child").unwrap();

        assert_eq!(store.get_benchmark_controls("root").unwrap(), vec!["c1"]);
        assert_eq!(store.get_benchmark_children("root").unwrap(), vec!["child"]);
        assert_eq!(store.get_benchmark_metadata("root").unwrap().unwrap(), benchmark.metadata);
    }

    #[test]
    fn test_clear_scopes() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_control(&Control::new("c1", "One"), WriteMode::InsertSkip).unwrap();
        store.insert_benchmark(&Benchmark::new("b1", "B"), WriteMode::InsertSkip).unwrap();
        store.insert_benchmark_control("b1", "c1").unwrap();

        store.clear(ClearScope::LinksOnly).unwrap();
        assert_eq!(store.count(OwnedTable::BenchmarkControls).unwrap(), 0);
        assert_eq!(store.count(OwnedTable::Controls).unwrap(), 1);

        store.clear(ClearScope::All).unwrap();
        assert_eq!(store.stats().unwrap().total(), 0);
    }

    #[test]
    fn test_transaction_rollback() {
        let mut store = SqliteStore::open_in_memory().unwrap();

        let result: Result<()> = store.with_transaction(|s| {
            s.insert_control(&Control::new("c1", "One"), WriteMode::InsertSkip)?;
            Err(crate::Error::Config("abort".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(store.count(OwnedTable::Controls).unwrap(), 0);
    }

    #[test]
    fn test_upsert_sql_updates_non_key_columns() {
        let sql = insert_sql(OwnedTable::QueryViews, &["id", "title"], &["id"], WriteMode::Upsert);
        assert_eq!(
            sql,
            "INSERT INTO query_views (id, title) VALUES (?1, ?2) ON CONFLICT(id) DO UPDATE SET title = excluded.title"
        );

        let sql = insert_sql(
            OwnedTable::BenchmarkChildren,
            &["benchmark_id", "child_id"],
            &["benchmark_id", "child_id"],
            WriteMode::Upsert,
        );
        assert!(sql.ends_with("DO NOTHING"));
    }
}
