//! Publisher agreement identifiers.
//!
//! An [`AgreementMap`] maps known entity names to agreement IDs. Lookup is a
//! case-insensitive containment test of each key inside the publisher's
//! display name; the first key (in insertion order) that matches wins, so
//! the map keeps document order when deserialized.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// What to do when a publisher matches no agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgreementPolicy {
    /// Halt generation of the whole file.
    #[default]
    Strict,
    /// Record a warning and emit the chain with a blank agreement.
    Lenient,
}

/// Ordered entity name → agreement ID table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgreementMap {
    entries: Vec<(String, String)>,
}

impl AgreementMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. A later duplicate key never shadows an earlier one.
    pub fn insert(&mut self, name: impl Into<String>, agreement: impl Into<String>) {
        self.entries.push((name.into(), agreement.into()));
    }

    pub fn with(mut self, name: impl Into<String>, agreement: impl Into<String>) -> Self {
        self.insert(name, agreement);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Resolve the agreement ID for a publisher display name.
    pub fn resolve(&self, publisher: &str) -> Option<&str> {
        let haystack = publisher.trim().to_uppercase();
        self.entries
            .iter()
            .find(|(key, _)| {
                let needle = key.trim().to_uppercase();
                !needle.is_empty() && haystack.contains(&needle)
            })
            .map(|(_, agreement)| agreement.trim())
            .filter(|agreement| !agreement.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AgreementMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Serialize for AgreementMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, agreement) in &self.entries {
            map.serialize_entry(name, agreement)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AgreementMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AgreementMapVisitor)
    }
}

struct AgreementMapVisitor;

impl<'de> Visitor<'de> for AgreementMapVisitor {
    type Value = AgreementMap;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object of publisher name to agreement ID")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = AgreementMap::new();
        while let Some((name, agreement)) = access.next_entry::<String, AgreementId>()? {
            map.insert(name, agreement.0);
        }
        Ok(map)
    }
}

/// Agreement IDs show up both as strings and as bare numbers.
struct AgreementId(String);

impl<'de> Deserialize<'de> for AgreementId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(s) => Ok(AgreementId(s)),
            serde_json::Value::Number(n) => Ok(AgreementId(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "agreement ID must be a string or number, got {}",
                other
            ))),
        }
    }
}
