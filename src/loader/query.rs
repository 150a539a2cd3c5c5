//! Query loading: standalone query files and the shared query body format

use super::builder::{read_definition, CatalogBuilder, DeferredFailure};
use super::de::{null_as_default, one_or_many};
use crate::ignore::IgnoreFilter;
use crate::model::{Query, QueryParameter, DEFAULT_ENGINE};
use crate::sql::ParseError;
use crate::Result;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

/// Query body, shared by standalone files, embedded control queries and views
#[derive(Debug, Clone, Deserialize)]
pub struct QueryDef {
    #[serde(default)]
    pub engine: Option<String>,
    pub query_to_execute: String,
    #[serde(default)]
    pub primary_table: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub list_of_tables: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: Vec<QueryParameter>,
    #[serde(default)]
    pub global: bool,
    #[serde(default, alias = "integration_types", deserialize_with = "one_or_many")]
    pub integration_type: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct QueryFile {
    id: String,
    #[serde(flatten)]
    query: QueryDef,
}

impl CatalogBuilder {
    /// Load every standalone query file under `dir`
    pub fn load_queries(&mut self, dir: &Path, filter: &IgnoreFilter) -> Result<()> {
        for path in self.definition_files(dir, filter)? {
            let file: QueryFile = read_definition(&path)?;
            self.report.query_files += 1;
            debug!("Loading query {} from {}", file.id, path.display());

            match self.normalize_query(&file.id, file.query, &BTreeSet::new()) {
                Ok(query) => self.add_query(query),
                Err(error) => {
                    debug!("Deferring unparsable query {}: {}", file.id, error);
                    self.deferred
                        .entry(file.id)
                        .or_insert(DeferredFailure { path, error });
                }
            }
        }
        Ok(())
    }

    /// Turn a query body into a `Query`, extracting tables when none are listed.
    ///
    /// `inherited_types` apply when the body declares no integration types.
    pub(super) fn normalize_query(
        &self,
        id: &str,
        def: QueryDef,
        inherited_types: &BTreeSet<String>,
    ) -> std::result::Result<Query, ParseError> {
        let list_of_tables = if def.list_of_tables.is_empty() {
            self.extractor.extract_table_set(&def.query_to_execute)?
        } else {
            def.list_of_tables.into_iter().collect()
        };

        let mut parameters: Vec<QueryParameter> = Vec::with_capacity(def.parameters.len());
        for parameter in def.parameters {
            if parameters.iter().any(|p| p.key == parameter.key) {
                warn!("Query {} declares parameter {} twice, keeping first", id, parameter.key);
                continue;
            }
            parameters.push(parameter);
        }

        let integration_types = if def.integration_type.is_empty() {
            inherited_types.clone()
        } else {
            def.integration_type.into_iter().collect()
        };

        Ok(Query {
            id: id.to_string(),
            engine: def
                .engine
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ENGINE.to_string()),
            query_to_execute: def.query_to_execute,
            primary_table: def.primary_table.filter(|t| !t.trim().is_empty()),
            list_of_tables,
            parameters,
            global: def.global,
            integration_types,
        })
    }

    /// Add a normalized query; the first definition of an id wins
    pub fn add_query(&mut self, query: Query) {
        if self.queries.contains_key(&query.id) {
            warn!("Duplicate query {}, keeping first definition", query.id);
            self.report.duplicate_queries.push(query.id);
            return;
        }
        self.deferred.remove(&query.id);
        self.queries.insert(query.id.clone(), query);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BenchsyncConfig;
    use std::fs;

    fn builder() -> CatalogBuilder {
        CatalogBuilder::new(&BenchsyncConfig::default()).unwrap()
    }

    #[test]
    fn test_missing_tables_are_extracted() {
        let def: QueryDef = serde_yaml::from_str(
            "query_to_execute: SELECT b.name FROM aws_s3_bucket b JOIN aws_account a ON a.id = b.account_id\n",
        )
        .unwrap();

        let query = builder().normalize_query("q1", def, &BTreeSet::new()).unwrap();
        assert_eq!(query.engine, DEFAULT_ENGINE);
        assert_eq!(query.primary_table, None);
        assert_eq!(
            query.list_of_tables.into_iter().collect::<Vec<_>>(),
            vec!["aws_account", "aws_s3_bucket"]
        );
    }

    #[test]
    fn test_declared_tables_win() {
        let def: QueryDef = serde_yaml::from_str(
            "engine: odysseus\nquery_to_execute: not sql at all\nprimary_table: aws_iam_user\nlist_of_tables: [aws_iam_user]\nintegration_type: aws\n",
        )
        .unwrap();

        let query = builder().normalize_query("q2", def, &BTreeSet::new()).unwrap();
        assert_eq!(query.engine, "odysseus");
        assert_eq!(query.primary_table.as_deref(), Some("aws_iam_user"));
        assert!(query.list_of_tables.contains("aws_iam_user"));
        assert!(query.integration_types.contains("aws"));
    }

    #[test]
    fn test_duplicate_parameters_keep_first() {
        let def: QueryDef = serde_yaml::from_str(
            "query_to_execute: SELECT 1 FROM t\nparameters:\n  - key: region\n    default_value: eu-west-1\n  - key: region\n    required: true\n",
        )
        .unwrap();

        let query = builder().normalize_query("q3", def, &BTreeSet::new()).unwrap();
        assert_eq!(query.parameters.len(), 1);
        assert_eq!(query.parameters[0].default_value.as_deref(), Some("eu-west-1"));
        assert!(!query.parameters[0].required);
    }

    #[test]
    fn test_unparsable_standalone_query_is_deferred() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.yaml"), "id: broken\nquery_to_execute: SELEC nope FROM\n").unwrap();
        fs::write(dir.path().join("ok.yaml"), "id: ok\nquery_to_execute: SELECT * FROM t1\n").unwrap();

        let mut builder = builder();
        builder
            .load_queries(dir.path(), &IgnoreFilter::new(dir.path(), None))
            .unwrap();

        assert!(builder.queries.contains_key("ok"));
        assert!(!builder.queries.contains_key("broken"));
        assert!(builder.deferred.contains_key("broken"));
        assert_eq!(builder.report.query_files, 2);
    }
}
