//! Query view loading; each view registers its query under the view id

use super::builder::{read_definition, CatalogBuilder};
use super::de::null_as_default;
use super::query::QueryDef;
use crate::ignore::IgnoreFilter;
use crate::model::QueryView;
use crate::Result;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct QueryViewFile {
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    description: String,
    query: QueryDef,
    #[serde(default, deserialize_with = "null_as_default")]
    dependencies: Vec<String>,
}

impl CatalogBuilder {
    /// Load every query view file under `dir`.
    ///
    /// A view whose query does not parse is dropped with a warning.
    pub fn load_views(&mut self, dir: &Path, filter: &IgnoreFilter) -> Result<()> {
        for path in self.definition_files(dir, filter)? {
            let file: QueryViewFile = read_definition(&path)?;
            self.report.view_files += 1;
            debug!("Loading query view {} from {}", file.id, path.display());

            if self.has_view(&file.id) {
                warn!("Duplicate query view {}, keeping first definition", file.id);
                self.report.duplicate_views.push(file.id);
                continue;
            }

            let query = match self.normalize_query(&file.id, file.query, &BTreeSet::new()) {
                Ok(query) => query,
                Err(e) => {
                    warn!("Dropping query view {}: {}", file.id, e);
                    self.report.dropped_views.push(file.id);
                    continue;
                }
            };
            self.add_query(query);

            let mut view = QueryView::new(file.id);
            view.title = file.title;
            view.description = file.description;
            view.dependencies = file.dependencies;
            self.views.push(view);
        }
        Ok(())
    }

    /// Add a view whose query was added separately under the view's id
    pub fn add_view(&mut self, view: QueryView) {
        if self.has_view(&view.id) {
            warn!("Duplicate query view {}, keeping first definition", view.id);
            self.report.duplicate_views.push(view.id);
            return;
        }
        self.views.push(view);
    }

    fn has_view(&self, id: &str) -> bool {
        self.views.iter().any(|v| v.id == id)
    }
}
