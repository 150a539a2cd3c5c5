//! Tags - key → multi-value labels shared by controls and benchmarks

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Prefix reserved for tags synthesized from enrichment text.
pub const RESERVED_TAG_PREFIX: &str = "x-enrichment-";

/// Tags keyed by tag key. Ordered so persisted rows and reports are stable.
pub type TagMap = BTreeMap<String, Vec<String>>;

/// A single tag row: one key with all of its values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub values: Vec<String>,
}

impl Tag {
    pub fn new(key: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            key: key.into(),
            values,
        }
    }

    /// Whether this tag was synthesized from enrichment text
    pub fn is_reserved(&self) -> bool {
        self.key.starts_with(RESERVED_TAG_PREFIX)
    }
}

/// Flatten a tag map into rows, in key order.
pub fn tags_of(map: &TagMap) -> impl Iterator<Item = Tag> + '_ {
    map.iter().map(|(key, values)| Tag::new(key.clone(), values.clone()))
}

/// Definition files may write a tag value as a bare string or as a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum TagValue {
    One(String),
    Many(Vec<String>),
}

/// Deserialize a `tags:` block, accepting scalar or list values.
pub fn deserialize_tags<'de, D>(deserializer: D) -> std::result::Result<TagMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, TagValue>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let values = match value {
                TagValue::One(v) => vec![v],
                TagValue::Many(vs) => vs,
            };
            (key, values)
        })
        .collect())
}
