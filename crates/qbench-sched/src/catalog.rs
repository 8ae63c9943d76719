//! Ansatz and dataset catalog entries, and the short summaries shared with
//! encodings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::encoding::Encoding;
use crate::run::counters;

/// Kind of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Trainable circuit the worker attaches after the encoding.
    Ansatz,
    /// Reference dataset the worker trains and evaluates on.
    Dataset,
}

impl ResourceKind {
    /// Lowercase name used in routes and storage.
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Ansatz => "ansatz",
            ResourceKind::Dataset => "dataset",
        }
    }

    /// Counter that allocates ids for this kind.
    pub fn counter(&self) -> &'static str {
        match self {
            ResourceKind::Ansatz => counters::ANSAETZE,
            ResourceKind::Dataset => counters::DATASETS,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ansatz" => Ok(ResourceKind::Ansatz),
            "dataset" => Ok(ResourceKind::Dataset),
            other => Err(format!("unknown resource kind '{other}'")),
        }
    }
}

/// An ansatz or dataset as kept in the store.
///
/// Ansatz circuits carry trainable parameters rather than `input_<k>`
/// references, so they are stored as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: u64,
    pub kind: ResourceKind,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub depth: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogEntry {
    pub fn new(id: u64, kind: ResourceKind, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            name: name.into(),
            description: String::new(),
            depth: 0,
            circuit: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_circuit(mut self, circuit: Value) -> Self {
        self.circuit = Some(circuit);
        self
    }

    /// Replace the editable fields with those of `other`, keeping id, kind
    /// and creation time.
    pub fn replace_with(&mut self, other: CatalogEntry) {
        self.name = other.name;
        self.description = other.description;
        self.depth = other.depth;
        self.circuit = other.circuit;
        self.updated_at = Utc::now();
    }

    pub fn summary(&self) -> ResourceSummary {
        ResourceSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            depth: self.depth,
        }
    }
}

/// Name, description and depth of a stored resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub name: String,
    pub description: String,
    pub depth: usize,
}

impl From<&Encoding> for ResourceSummary {
    fn from(encoding: &Encoding) -> Self {
        Self {
            name: encoding.name.clone(),
            description: encoding.description.clone(),
            depth: encoding.depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_names() {
        assert_eq!(ResourceKind::Ansatz.name(), "ansatz");
        assert_eq!("dataset".parse::<ResourceKind>(), Ok(ResourceKind::Dataset));
        assert!("encoding".parse::<ResourceKind>().is_err());
        assert_ne!(ResourceKind::Ansatz.counter(), ResourceKind::Dataset.counter());
        assert_eq!(serde_json::to_value(ResourceKind::Ansatz).unwrap(), json!("ansatz"));
    }

    #[test]
    fn test_replace_keeps_identity() {
        let mut entry = CatalogEntry::new(4, ResourceKind::Ansatz, "hea")
            .with_depth(3)
            .with_circuit(json!({"circuit": []}));
        let created = entry.created_at;

        entry.replace_with(
            CatalogEntry::new(9, ResourceKind::Dataset, "hea-v2").with_description("two layers"),
        );

        assert_eq!(entry.id, 4);
        assert_eq!(entry.kind, ResourceKind::Ansatz);
        assert_eq!(entry.created_at, created);
        assert_eq!(entry.name, "hea-v2");
        assert_eq!(entry.depth, 0);
        assert!(entry.circuit.is_none());
        assert_eq!(
            entry.summary(),
            ResourceSummary {
                name: "hea-v2".into(),
                description: "two layers".into(),
                depth: 0
            }
        );
    }

    #[test]
    fn test_summary_skips_missing_circuit() {
        let entry = CatalogEntry::new(1, ResourceKind::Dataset, "iris");
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("circuit").is_none());
        assert_eq!(value["kind"], "dataset");
    }
}
