//! Control loading, with embedded queries and enrichment tags

use super::builder::{read_definition, CatalogBuilder};
use super::de::{null_as_default, one_or_many, severity};
use super::query::QueryDef;
use crate::ignore::IgnoreFilter;
use crate::model::tag::deserialize_tags;
use crate::model::{Control, ControlIdx, Severity, TagMap};
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ControlFile {
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    description: String,
    #[serde(default, alias = "integration_types", deserialize_with = "one_or_many")]
    integration_type: Vec<String>,
    #[serde(default, deserialize_with = "severity")]
    severity: Option<Severity>,
    #[serde(default)]
    managed: bool,
    #[serde(default)]
    manual_verification: bool,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default, deserialize_with = "deserialize_tags")]
    tags: TagMap,
    #[serde(default)]
    query_id: Option<String>,
    #[serde(default)]
    query: Option<QueryDef>,
}

impl CatalogBuilder {
    /// Load every control file under `dir`
    pub fn load_controls(&mut self, dir: &Path, filter: &IgnoreFilter) -> Result<()> {
        for path in self.definition_files(dir, filter)? {
            let file: ControlFile = read_definition(&path)?;
            self.report.control_files += 1;
            debug!("Loading control {} from {}", file.id, path.display());
            self.add_control_file(file)?;
        }
        Ok(())
    }

    fn add_control_file(&mut self, file: ControlFile) -> Result<()> {
        if self.control_index.contains_key(&file.id) {
            warn!("Duplicate control {}, keeping first definition", file.id);
            self.report.duplicate_controls.push(file.id);
            return Ok(());
        }

        let integration_types: BTreeSet<String> = file.integration_type.into_iter().collect();

        let query_id = match file.query {
            Some(def) => {
                if let Some(declared) = file.query_id.as_deref().filter(|q| *q != file.id) {
                    warn!(
                        "Control {} embeds a query and also names query {}, using the embedded one",
                        file.id, declared
                    );
                }
                let query = self
                    .normalize_query(&file.id, def, &integration_types)
                    .map_err(|source| Error::Sql {
                        query_id: file.id.clone(),
                        source,
                    })?;
                self.add_query(query);
                Some(file.id.clone())
            }
            None => file.query_id.filter(|q| !q.trim().is_empty()),
        };

        let mut control = Control::new(file.id, file.title);
        control.description = file.description;
        control.severity = file.severity.unwrap_or_default();
        control.integration_types = integration_types;
        control.manual_verification = file.manual_verification;
        control.managed = file.managed;
        control.enabled = file.enabled;
        control.query_id = query_id;
        control.tags = file.tags;

        self.add_control(control);
        Ok(())
    }

    /// Add a control, merging in its enrichment tags. The first definition of an id wins.
    pub fn add_control(&mut self, mut control: Control) {
        if self.control_index.contains_key(&control.id) {
            warn!("Duplicate control {}, keeping first definition", control.id);
            self.report.duplicate_controls.push(control.id);
            return;
        }

        let enrichment = self.enrichment.tags_for(&control.enrichment_key());
        if enrichment.is_empty() {
            debug!("No enrichment for control {}", control.id);
        }
        for tag in enrichment {
            control.tags.insert(tag.key, tag.values);
        }

        self.control_index
            .insert(control.id.clone(), ControlIdx(self.controls.len()));
        self.controls.push(control);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BenchsyncConfig;
    use crate::loader::enrichment::{Enrichment, EnrichmentCategory};
    use std::fs;

    fn load(files: &[(&str, &str)], enrichment: Enrichment) -> Result<CatalogBuilder> {
        let dir = tempfile::tempdir().unwrap();
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).unwrap();
        }
        let mut builder = CatalogBuilder::new(&BenchsyncConfig::default())?.with_enrichment(enrichment);
        builder.load_controls(dir.path(), &IgnoreFilter::new(dir.path(), None))?;
        Ok(builder)
    }

    #[test]
    fn test_embedded_query_takes_control_id() {
        let builder = load(
            &[(
                "s3.yaml",
                r#"
id: aws_s3_encrypted
title: S3 buckets are encrypted
integration_type: [aws]
tags:
  category: security
query:
  query_to_execute: SELECT arn FROM aws_s3_bucket WHERE encryption IS NULL
"#,
            )],
            Enrichment::new(),
        )
        .unwrap();

        let control = &builder.controls[0];
        assert_eq!(control.severity, Severity::Low);
        assert!(control.enabled);
        assert_eq!(control.query_id.as_deref(), Some("aws_s3_encrypted"));
        assert_eq!(control.tags["category"], vec!["security"]);

        let query = &builder.queries["aws_s3_encrypted"];
        assert!(query.list_of_tables.contains("aws_s3_bucket"));
        assert!(query.integration_types.contains("aws"));
    }

    #[test]
    fn test_enrichment_tags_are_merged() {
        let mut enrichment = Enrichment::new();
        enrichment.insert(EnrichmentCategory::ManualRemediation, "aws_iam_mfa", "Enable MFA in the console.");

        let builder = load(
            &[("iam.yaml", "id: AWS_IAM_MFA\ntitle: MFA enabled\nseverity: critical\nquery_id: iam_users\n")],
            enrichment,
        )
        .unwrap();

        let control = &builder.controls[0];
        assert_eq!(control.severity, Severity::Critical);
        assert_eq!(control.query_id.as_deref(), Some("iam_users"));
        assert_eq!(
            control.tags["x-enrichment-manual-remediation"],
            vec!["Enable MFA in the console."]
        );
    }

    #[test]
    fn test_embedded_parse_failure_is_fatal() {
        let result = load(
            &[("bad.yaml", "id: bad\nquery:\n  query_to_execute: SELEC * FRM\n")],
            Enrichment::new(),
        );
        assert!(matches!(result, Err(Error::Sql { query_id, .. }) if query_id == "bad"));
    }

    #[test]
    fn test_duplicate_control_keeps_first() {
        let builder = load(
            &[
                ("a.yaml", "id: c1\ntitle: First\n"),
                ("b.yaml", "id: c1\ntitle: Second\n"),
            ],
            Enrichment::new(),
        )
        .unwrap();

        assert_eq!(builder.controls.len(), 1);
        assert_eq!(builder.controls[0].title, "First");
        assert_eq!(builder.report.duplicate_controls, vec!["c1"]);
    }

    #[test]
    fn test_malformed_file_is_fatal() {
        let result = load(&[("broken.yaml", "id: [unclosed\n")], Enrichment::new());
        assert!(matches!(result, Err(Error::Definition { .. })));
    }

    #[test]
    fn test_unknown_severity_is_fatal() {
        let result = load(
            &[("urgent.yaml", "id: c1
title: Urgent
severity: urgent
")],
            Enrichment::new(),
        );
        assert!(matches!(result, Err(Error::Definition { path, .. }) if path.ends_with("urgent.yaml")));
    }
}
