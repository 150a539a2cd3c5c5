//! Lenient field deserializers shared by the definition file formats

use crate::model::Severity;
use serde::{Deserialize, Deserializer};

/// Treat an explicit `null` (e.g. `controls:` with no items) as the default.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Accept a bare string or a list of strings.
pub fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}

/// Case-insensitive severity; empty or absent means unset.
pub fn severity<'de, D>(deserializer: D) -> Result<Option<Severity>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| s.parse().map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "null_as_default")]
        ids: Vec<String>,
        #[serde(default, deserialize_with = "one_or_many")]
        kinds: Vec<String>,
        #[serde(default, deserialize_with = "severity")]
        severity: Option<Severity>,
    }

    #[test]
    fn test_lenient_fields() {
        let holder: Holder = serde_yaml::from_str("ids:\nkinds: aws\nseverity: High\n").unwrap();
        assert!(holder.ids.is_empty());
        assert_eq!(holder.kinds, vec!["aws"]);
        assert_eq!(holder.severity, Some(Severity::High));

        let holder: Holder = serde_yaml::from_str("kinds: [aws, azure]\nseverity: ''\n").unwrap();
        assert_eq!(holder.kinds, vec!["aws", "azure"]);
        assert_eq!(holder.severity, None);

        assert!(serde_yaml::from_str::<Holder>("severity: urgent\n").is_err());
    }
}
