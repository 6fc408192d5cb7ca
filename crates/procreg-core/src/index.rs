//! Secondary index descriptors.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Kind of index maintained by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    #[default]
    Json,
    Text,
    /// The store's built-in primary index. Listed, never created.
    Special,
}

impl IndexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
            Self::Special => "special",
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            "special" => Ok(Self::Special),
            _ => Err(CoreError::invalid_index_type(s)),
        }
    }
}

/// Request to create an index. Field order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub fields: Vec<String>,
    #[serde(rename = "type", default)]
    pub index_type: IndexType,
}

impl IndexDescriptor {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            fields: fields.into_iter().map(Into::into).collect(),
            index_type: IndexType::Json,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_type(mut self, index_type: IndexType) -> Self {
        self.index_type = index_type;
        self
    }

    /// Checks that the descriptor can be sent to the store.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.fields.is_empty() {
            return Err(CoreError::invalid_index("at least one field is required"));
        }
        if self.fields.iter().any(|f| f.trim().is_empty()) {
            return Err(CoreError::invalid_index("field names must not be empty"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.fields.iter().find(|f| !seen.insert(f.as_str())) {
            return Err(CoreError::invalid_index(format!("duplicate field '{dup}'")));
        }
        if self.index_type == IndexType::Special {
            return Err(CoreError::invalid_index(
                "special indexes are managed by the store",
            ));
        }
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(CoreError::invalid_index("index name must not be blank"));
        }
        Ok(())
    }

    /// Equality used for idempotent creation: type and ordered fields, name ignored.
    pub fn matches(&self, info: &IndexInfo) -> bool {
        self.index_type == info.index_type && self.fields == info.fields
    }
}

/// An index as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub index_type: IndexType,
    pub fields: Vec<String>,
    /// Owning design document, absent for the store's special index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_doc: Option<String>,
}

/// Result of an index creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOutcome {
    Created,
    AlreadyExisted,
}

impl fmt::Display for IndexOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::AlreadyExisted => write!(f, "already existed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info(fields: &[&str], index_type: IndexType) -> IndexInfo {
        IndexInfo {
            name: "idx".into(),
            index_type,
            fields: fields.iter().map(|f| f.to_string()).collect(),
            design_doc: Some("_design/idx".into()),
        }
    }

    #[test]
    fn test_descriptor_defaults_to_json() {
        let desc: IndexDescriptor = serde_json::from_value(json!({"fields": ["state"]})).unwrap();
        assert_eq!(desc.index_type, IndexType::Json);
        assert!(desc.name.is_none());
    }

    #[test]
    fn test_descriptor_wire_shape() {
        let desc = IndexDescriptor::new(["state", "updatedAt"])
            .with_name("by-state")
            .with_type(IndexType::Text);
        assert_eq!(
            serde_json::to_value(&desc).unwrap(),
            json!({"name": "by-state", "fields": ["state", "updatedAt"], "type": "text"})
        );
    }

    #[test]
    fn test_matches_is_order_sensitive() {
        let desc = IndexDescriptor::new(["state", "updatedAt"]);
        assert!(desc.matches(&info(&["state", "updatedAt"], IndexType::Json)));
        assert!(!desc.matches(&info(&["updatedAt", "state"], IndexType::Json)));
        assert!(!desc.matches(&info(&["state", "updatedAt"], IndexType::Text)));
        assert!(!desc.matches(&info(&["state"], IndexType::Json)));
    }

    #[test]
    fn test_matches_ignores_name() {
        let desc = IndexDescriptor::new(["state"]).with_name("other");
        assert!(desc.matches(&info(&["state"], IndexType::Json)));
    }

    #[test]
    fn test_validate() {
        assert!(IndexDescriptor::new(["state"]).validate().is_ok());
        assert!(IndexDescriptor::new(Vec::<String>::new()).validate().is_err());
        assert!(IndexDescriptor::new(["state", " "]).validate().is_err());
        assert!(IndexDescriptor::new(["state", "state"]).validate().is_err());
        assert!(
            IndexDescriptor::new(["_id"])
                .with_type(IndexType::Special)
                .validate()
                .is_err()
        );
        assert!(IndexDescriptor::new(["state"]).with_name("").validate().is_err());
    }

    #[test]
    fn test_index_type_parsing() {
        assert_eq!("JSON".parse::<IndexType>().unwrap(), IndexType::Json);
        assert_eq!("text".parse::<IndexType>().unwrap(), IndexType::Text);
        assert!("geo".parse::<IndexType>().is_err());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(IndexOutcome::Created.to_string(), "created");
        assert_eq!(IndexOutcome::AlreadyExisted.to_string(), "already existed");
    }
}
