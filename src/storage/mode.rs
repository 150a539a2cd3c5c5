//! Write and clear policies for the synchronization pipeline

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What an insert does when a row with the same key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Keep the existing row untouched. Re-syncs never refresh content.
    #[default]
    InsertSkip,
    /// Overwrite the existing row's non-key columns
    Upsert,
}

impl WriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::InsertSkip => "insert-skip",
            WriteMode::Upsert => "upsert",
        }
    }
}

impl FromStr for WriteMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "insert-skip" | "skip" | "insert" => Ok(WriteMode::InsertSkip),
            "upsert" | "update" | "insert-or-update" => Ok(WriteMode::Upsert),
            _ => Err(Error::Config(format!("Unknown write mode: {}", s))),
        }
    }
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which prior-run rows are deleted before a sync reinserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClearScope {
    /// Every table the pipeline owns: a full replace
    #[default]
    All,
    /// Only tag and junction tables; entity rows persist across runs
    LinksOnly,
}

impl ClearScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClearScope::All => "all",
            ClearScope::LinksOnly => "links-only",
        }
    }
}

impl FromStr for ClearScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "all" | "full" => Ok(ClearScope::All),
            "links-only" | "links" => Ok(ClearScope::LinksOnly),
            _ => Err(Error::Config(format!("Unknown clear scope: {}", s))),
        }
    }
}

impl std::fmt::Display for ClearScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!(WriteMode::from_str("upsert").unwrap(), WriteMode::Upsert);
        assert_eq!(WriteMode::from_str("Insert-Skip").unwrap(), WriteMode::InsertSkip);
        assert!(WriteMode::from_str("merge").is_err());

        assert_eq!(ClearScope::from_str("links").unwrap(), ClearScope::LinksOnly);
        assert_eq!(ClearScope::from_str(ClearScope::All.as_str()).unwrap(), ClearScope::All);
    }
}
