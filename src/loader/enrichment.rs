//! Enrichment text - free-form documents attached to controls as reserved tags
//!
//! Each category is a directory of plain files. A file's lowercased stem is
//! the control id it enriches and its content becomes the tag value.

use super::walk::walk_files;
use crate::ignore::IgnoreFilter;
use crate::model::Tag;
use crate::Result;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnrichmentCategory {
    ManualRemediation,
    CliRemediation,
    GuardrailRemediation,
    ProgrammaticRemediation,
    NoncomplianceCost,
    UsefulnessExample,
    Explanation,
}

impl EnrichmentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichmentCategory::ManualRemediation => "manual-remediation",
            EnrichmentCategory::CliRemediation => "cli-remediation",
            EnrichmentCategory::GuardrailRemediation => "guardrail-remediation",
            EnrichmentCategory::ProgrammaticRemediation => "programmatic-remediation",
            EnrichmentCategory::NoncomplianceCost => "noncompliance-cost",
            EnrichmentCategory::UsefulnessExample => "usefulness-example",
            EnrichmentCategory::Explanation => "explanation",
        }
    }

    pub fn all() -> &'static [EnrichmentCategory] {
        &[
            EnrichmentCategory::ManualRemediation,
            EnrichmentCategory::CliRemediation,
            EnrichmentCategory::GuardrailRemediation,
            EnrichmentCategory::ProgrammaticRemediation,
            EnrichmentCategory::NoncomplianceCost,
            EnrichmentCategory::UsefulnessExample,
            EnrichmentCategory::Explanation,
        ]
    }

    /// Directory holding this category, relative to the enrichment root
    pub fn directory(&self) -> &'static str {
        match self {
            EnrichmentCategory::ManualRemediation => "remediation/manual",
            EnrichmentCategory::CliRemediation => "remediation/cli",
            EnrichmentCategory::GuardrailRemediation => "remediation/guardrail",
            EnrichmentCategory::ProgrammaticRemediation => "remediation/programmatic",
            EnrichmentCategory::NoncomplianceCost => "noncompliance-cost",
            EnrichmentCategory::UsefulnessExample => "usefulness-example",
            EnrichmentCategory::Explanation => "explanation",
        }
    }

    /// Reserved tag key this category is emitted under
    pub fn tag_key(&self) -> &'static str {
        match self {
            EnrichmentCategory::ManualRemediation => "x-enrichment-manual-remediation",
            EnrichmentCategory::CliRemediation => "x-enrichment-cli-remediation",
            EnrichmentCategory::GuardrailRemediation => "x-enrichment-guardrail-remediation",
            EnrichmentCategory::ProgrammaticRemediation => "x-enrichment-programmatic-remediation",
            EnrichmentCategory::NoncomplianceCost => "x-enrichment-noncompliance-cost",
            EnrichmentCategory::UsefulnessExample => "x-enrichment-usefulness-example",
            EnrichmentCategory::Explanation => "x-enrichment-explanation",
        }
    }
}

impl std::fmt::Display for EnrichmentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category → lowercased control id → text
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    texts: BTreeMap<EnrichmentCategory, HashMap<String, String>>,
}

impl Enrichment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every category found under `root`. Missing categories are empty.
    pub fn load(root: &Path, filter: &IgnoreFilter) -> Result<Self> {
        let mut enrichment = Self::new();

        for category in EnrichmentCategory::all() {
            let dir = root.join(category.directory());
            for path in walk_files(&dir, filter, |_| true)? {
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    warn!("Skipping enrichment file with unreadable name: {}", path.display());
                    continue;
                };
                let text = std::fs::read_to_string(&path)?;
                let key = stem.to_lowercase();
                if enrichment.get(*category, &key).is_some() {
                    warn!("Duplicate {} enrichment for {}, keeping first", category, key);
                    continue;
                }
                enrichment.insert(*category, &key, text.trim_end());
            }
        }

        debug!("Loaded {} enrichment entries from {}", enrichment.len(), root.display());
        Ok(enrichment)
    }

    /// Set the text for a control; the key is lowercased
    pub fn insert(&mut self, category: EnrichmentCategory, control_id: &str, text: impl Into<String>) {
        self.texts
            .entry(category)
            .or_default()
            .insert(control_id.to_lowercase(), text.into());
    }

    pub fn get(&self, category: EnrichmentCategory, control_id: &str) -> Option<&str> {
        self.texts
            .get(&category)
            .and_then(|m| m.get(&control_id.to_lowercase()))
            .map(String::as_str)
    }

    /// Fold `other` in; entries already present are kept
    pub fn merge(&mut self, other: Enrichment) {
        for (category, entries) in other.texts {
            let target = self.texts.entry(category).or_default();
            for (key, text) in entries {
                target.entry(key).or_insert(text);
            }
        }
    }

    /// Reserved tags for one control, in category order
    pub fn tags_for(&self, control_id: &str) -> Vec<Tag> {
        EnrichmentCategory::all()
            .iter()
            .filter_map(|category| {
                self.get(*category, control_id)
                    .map(|text| Tag::new(category.tag_key(), vec![text.to_string()]))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.texts.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
