use crate::sql::DEFAULT_DIALECT;
use crate::sync::{ClearScope, SyncOptions, WriteMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Subdirectories of the configuration tree, relative to its root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub queries: String,
    pub controls: String,
    pub benchmarks: String,
    pub query_views: String,
    pub enrichment: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            queries: "queries".to_string(),
            controls: "controls".to_string(),
            benchmarks: "benchmarks".to_string(),
            query_views: "query-views".to_string(),
            enrichment: "tags".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchsyncConfig {
    pub database: Option<String>,
    pub path: Option<String>,
    pub layout: LayoutConfig,
    /// Definition file extensions, without the dot
    pub extensions: Vec<String>,
    pub sql_dialect: String,
    pub write_mode: WriteMode,
    pub clear_scope: ClearScope,
    /// Extra gitignore-style patterns excluded from the walk
    pub exclude: Vec<String>,
}

impl Default for BenchsyncConfig {
    fn default() -> Self {
        Self {
            database: None,
            path: None,
            layout: LayoutConfig::default(),
            extensions: vec!["yaml".to_string(), "yml".to_string()],
            sql_dialect: DEFAULT_DIALECT.to_string(),
            write_mode: WriteMode::default(),
            clear_scope: ClearScope::default(),
            exclude: Vec::new(),
        }
    }
}

impl BenchsyncConfig {
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            write_mode: self.write_mode,
            clear_scope: self.clear_scope,
        }
    }

    /// Whether a file is a definition file by extension
    pub fn is_definition_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("benchsync.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".benchsync").join("benchsync.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<BenchsyncConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: BenchsyncConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: BenchsyncConfig = toml::from_str(
            r#"
            sql_dialect = "generic"
            write_mode = "upsert"

            [layout]
            benchmarks = "frameworks"
            "#,
        )
        .unwrap();

        assert_eq!(config.sql_dialect, "generic");
        assert_eq!(config.write_mode, WriteMode::Upsert);
        assert_eq!(config.clear_scope, ClearScope::All);
        assert_eq!(config.layout.benchmarks, "frameworks");
        assert_eq!(config.layout.controls, "controls");
        assert_eq!(config.extensions, vec!["yaml", "yml"]);
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_definition_extension_match() {
        let config = BenchsyncConfig::default();
        assert!(config.is_definition_file(Path::new("controls/aws/s3.yaml")));
        assert!(config.is_definition_file(Path::new("controls/aws/s3.YML")));
        assert!(!config.is_definition_file(Path::new("controls/README.md")));
        assert!(!config.is_definition_file(Path::new("controls/Makefile")));
    }
}
