//! Controls - single checkable compliance rules

use super::tag::TagMap;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Control severity. Absent severities load as `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn all() -> &'static [Severity] {
        &[
            Severity::None,
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ]
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Severity::None),
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(Error::Config(format!("Unknown severity: {}", s))),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A loaded control.
///
/// The query is held by identifier, not owned: the catalog owns queries and a
/// control may point at a standalone query defined in another file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Control {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub integration_types: BTreeSet<String>,
    pub manual_verification: bool,
    pub managed: bool,
    pub enabled: bool,
    pub query_id: Option<String>,
    pub tags: TagMap,
}

impl Control {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            severity: Severity::default(),
            integration_types: BTreeSet::new(),
            manual_verification: false,
            managed: false,
            enabled: true,
            query_id: None,
            tags: TagMap::new(),
        }
    }

    pub fn with_query(mut self, query_id: impl Into<String>) -> Self {
        self.query_id = Some(query_id.into());
        self
    }

    pub fn with_integration_type(mut self, integration_type: impl Into<String>) -> Self {
        self.integration_types.insert(integration_type.into());
        self
    }

    /// Key used for enrichment lookups
    pub fn enrichment_key(&self) -> String {
        self.id.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_roundtrip() {
        for severity in Severity::all() {
            let parsed: Severity = severity.as_str().parse().unwrap();
            assert_eq!(*severity, parsed);
        }
    }

    #[test]
    fn test_severity_defaults_to_low() {
        assert_eq!(Severity::default(), Severity::Low);
        assert_eq!(Control::new("c1", "Control").severity, Severity::Low);
    }

    #[test]
    fn test_severity_rejects_unknown() {
        assert!(Severity::from_str("urgent").is_err());
        assert_eq!(Severity::from_str(" HIGH ").unwrap(), Severity::High);
    }
}
