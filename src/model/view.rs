//! Query views - named queries that other views and queries build on

use serde::Serialize;

/// A query view. Its query is stored in the catalog under the view's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub query_id: String,
    /// Identifiers of the views or queries this view depends on
    pub dependencies: Vec<String>,
}

impl QueryView {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            query_id: id.clone(),
            id,
            title: String::new(),
            description: String::new(),
            dependencies: Vec::new(),
        }
    }
}
