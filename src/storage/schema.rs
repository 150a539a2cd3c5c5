//! Database schema definitions

use serde::Serialize;

/// SQL to create the queries table
pub const CREATE_QUERIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS queries (
    id TEXT PRIMARY KEY,
    engine TEXT NOT NULL,
    query_to_execute TEXT NOT NULL,
    primary_table TEXT,
    list_of_tables TEXT NOT NULL DEFAULT '[]',
    global INTEGER NOT NULL DEFAULT 0,
    integration_types TEXT NOT NULL DEFAULT '[]'
)
"#;

/// SQL to create the query_parameters table
pub const CREATE_QUERY_PARAMETERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS query_parameters (
    query_id TEXT NOT NULL,
    key TEXT NOT NULL,
    required INTEGER NOT NULL DEFAULT 0,
    default_value TEXT,
    PRIMARY KEY (query_id, key)
)
"#;

/// SQL to create the controls table
pub const CREATE_CONTROLS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS controls (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    severity TEXT NOT NULL,
    integration_types TEXT NOT NULL DEFAULT '[]',
    manual_verification INTEGER NOT NULL DEFAULT 0,
    managed INTEGER NOT NULL DEFAULT 0,
    enabled INTEGER NOT NULL DEFAULT 1,
    query_id TEXT
)
"#;

/// SQL to create the control_tags table
pub const CREATE_CONTROL_TAGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS control_tags (
    key TEXT NOT NULL,
    control_id TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (key, control_id)
)
"#;

/// SQL to create the benchmarks table.
/// `metadata` holds the derived control/table closure as JSON.
pub const CREATE_BENCHMARKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS benchmarks (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    section_code TEXT NOT NULL,
    auto_assign INTEGER NOT NULL DEFAULT 0,
    tracks_drift_events INTEGER NOT NULL DEFAULT 0,
    integration_types TEXT NOT NULL DEFAULT '[]',
    metadata TEXT NOT NULL DEFAULT '{}'
)
"#;

/// SQL to create the benchmark_tags table
pub const CREATE_BENCHMARK_TAGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS benchmark_tags (
    key TEXT NOT NULL,
    benchmark_id TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (key, benchmark_id)
)
"#;

/// SQL to create the benchmark_children junction table
pub const CREATE_BENCHMARK_CHILDREN_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS benchmark_children (
    benchmark_id TEXT NOT NULL,
    child_id TEXT NOT NULL,
    PRIMARY KEY (benchmark_id, child_id)
)
"#;

/// SQL to create the benchmark_controls junction table
pub const CREATE_BENCHMARK_CONTROLS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS benchmark_controls (
    benchmark_id TEXT NOT NULL,
    control_id TEXT NOT NULL,
    PRIMARY KEY (benchmark_id, control_id)
)
"#;

/// SQL to create the query_views table
pub const CREATE_QUERY_VIEWS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS query_views (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    query_id TEXT NOT NULL
)
"#;

/// SQL to create the query_view_dependencies table
pub const CREATE_QUERY_VIEW_DEPENDENCIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS query_view_dependencies (
    view_id TEXT NOT NULL,
    dependency_id TEXT NOT NULL,
    PRIMARY KEY (view_id, dependency_id)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_controls_query ON controls(query_id)",
    "CREATE INDEX IF NOT EXISTS idx_control_tags_control ON control_tags(control_id)",
    "CREATE INDEX IF NOT EXISTS idx_benchmark_tags_benchmark ON benchmark_tags(benchmark_id)",
    "CREATE INDEX IF NOT EXISTS idx_benchmark_children_child ON benchmark_children(child_id)",
    "CREATE INDEX IF NOT EXISTS idx_benchmark_controls_control ON benchmark_controls(control_id)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_QUERIES_TABLE,
        CREATE_QUERY_PARAMETERS_TABLE,
        CREATE_CONTROLS_TABLE,
        CREATE_CONTROL_TAGS_TABLE,
        CREATE_BENCHMARKS_TABLE,
        CREATE_BENCHMARK_TAGS_TABLE,
        CREATE_BENCHMARK_CHILDREN_TABLE,
        CREATE_BENCHMARK_CONTROLS_TABLE,
        CREATE_QUERY_VIEWS_TABLE,
        CREATE_QUERY_VIEW_DEPENDENCIES_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}

/// Tables written by the synchronization pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnedTable {
    Queries,
    QueryParameters,
    Controls,
    ControlTags,
    Benchmarks,
    BenchmarkTags,
    BenchmarkChildren,
    BenchmarkControls,
    QueryViews,
    QueryViewDependencies,
}

impl OwnedTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnedTable::Queries => "queries",
            OwnedTable::QueryParameters => "query_parameters",
            OwnedTable::Controls => "controls",
            OwnedTable::ControlTags => "control_tags",
            OwnedTable::Benchmarks => "benchmarks",
            OwnedTable::BenchmarkTags => "benchmark_tags",
            OwnedTable::BenchmarkChildren => "benchmark_children",
            OwnedTable::BenchmarkControls => "benchmark_controls",
            OwnedTable::QueryViews => "query_views",
            OwnedTable::QueryViewDependencies => "query_view_dependencies",
        }
    }

    /// All owned tables, referenced tables before the tables that point at them
    pub fn all() -> &'static [OwnedTable] {
        &[
            OwnedTable::Queries,
            OwnedTable::QueryParameters,
            OwnedTable::Controls,
            OwnedTable::ControlTags,
            OwnedTable::Benchmarks,
            OwnedTable::BenchmarkTags,
            OwnedTable::BenchmarkChildren,
            OwnedTable::BenchmarkControls,
            OwnedTable::QueryViews,
            OwnedTable::QueryViewDependencies,
        ]
    }

    /// Tag and junction tables, rebuilt on every run regardless of clear scope
    pub fn is_link(&self) -> bool {
        matches!(
            self,
            OwnedTable::ControlTags
                | OwnedTable::BenchmarkTags
                | OwnedTable::BenchmarkChildren
                | OwnedTable::BenchmarkControls
                | OwnedTable::QueryViewDependencies
        )
    }
}

impl std::fmt::Display for OwnedTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
