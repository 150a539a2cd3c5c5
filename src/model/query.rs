//! Query records - executable statements a control evaluates

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Engine tag assigned when a definition does not name one.
pub const DEFAULT_ENGINE: &str = "sql";

/// A declared query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParameter {
    /// Parameter key, unique within its query
    pub key: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: Option<String>,
}

/// A normalized, immutable query.
///
/// Table names are held in ordered sets so that everything derived from them
/// serializes deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    pub id: String,
    pub engine: String,
    pub query_to_execute: String,
    /// Only set when the definition calls it out explicitly
    pub primary_table: Option<String>,
    pub list_of_tables: BTreeSet<String>,
    pub parameters: Vec<QueryParameter>,
    /// Context-independent query
    pub global: bool,
    pub integration_types: BTreeSet<String>,
}

impl Query {
    pub fn new(id: impl Into<String>, query_to_execute: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            engine: DEFAULT_ENGINE.to_string(),
            query_to_execute: query_to_execute.into(),
            primary_table: None,
            list_of_tables: BTreeSet::new(),
            parameters: Vec::new(),
            global: false,
            integration_types: BTreeSet::new(),
        }
    }

    pub fn with_primary_table(mut self, table: impl Into<String>) -> Self {
        self.primary_table = Some(table.into());
        self
    }

    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.list_of_tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parameter(mut self, parameter: QueryParameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}
