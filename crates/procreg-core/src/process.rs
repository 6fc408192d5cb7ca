//! Process documents and their state history.
//!
//! A [`ProcessDocument`] is the unit of storage. Its wire shape follows the
//! CouchDB conventions of the backing store: the identifier and revision are
//! serialized as `_id` and `_rev`, every other field is camelCase.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

use crate::error::CoreError;

/// Workflow state of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    Pending,
    Started,
    Running,
    Successful,
    Failed,
    Cancelled,
}

impl ProcessState {
    pub const ALL: [ProcessState; 6] = [
        Self::Pending,
        Self::Started,
        Self::Running,
        Self::Successful,
        Self::Failed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Running => "running",
            Self::Successful => "successful",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true for states a process does not leave on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Successful | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::invalid_state(s))
    }
}

/// One entry of a document's append-only history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChange {
    pub state: ProcessState,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StateChange {
    pub fn new(
        state: ProcessState,
        timestamp: OffsetDateTime,
        error_message: Option<String>,
    ) -> Self {
        Self {
            state,
            timestamp,
            error_message,
        }
    }
}

/// An audit-tracked workflow process as stored in the backing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDocument {
    /// Stable identifier; defaults to `process_id` on first save.
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Conflict token issued by the store. Compared for equality only.
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub process_id: String,
    pub state: ProcessState,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub created_at: Option<OffsetDateTime>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub history: Vec<StateChange>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl ProcessDocument {
    pub fn new(process_id: impl Into<String>, state: ProcessState) -> Self {
        Self {
            id: String::new(),
            revision: None,
            process_id: process_id.into(),
            state,
            description: String::new(),
            error_message: None,
            created_at: None,
            updated_at: None,
            history: Vec::new(),
            metadata: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The caller-supplied revision, treating an empty token as absent.
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref().filter(|rev| !rev.is_empty())
    }

    /// The state change representing the document's current state.
    pub fn state_change(&self, timestamp: OffsetDateTime) -> StateChange {
        StateChange::new(self.state, timestamp, self.error_message.clone())
    }

    pub fn latest_change(&self) -> Option<&StateChange> {
        self.history.last()
    }

    /// Parses a document from a raw store body.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Serializes the document into a raw store body.
    pub fn to_value(&self) -> Result<Value, CoreError> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn sample() -> ProcessDocument {
        let started = datetime!(2024-01-15 09:30:00 UTC);
        let failed = datetime!(2024-01-15 09:31:12.250 UTC);
        let mut doc = ProcessDocument::new("p1", ProcessState::Failed)
            .with_id("process:2024-01-15")
            .with_revision("2-abc")
            .with_description("nightly import")
            .with_error_message("upstream timeout")
            .with_metadata("source", json!("s3://bucket/key"))
            .with_metadata("attempts", json!({"max": 3, "used": [1, 2]}));
        doc.created_at = Some(started);
        doc.updated_at = Some(failed);
        doc.history = vec![
            StateChange::new(ProcessState::Started, started, None),
            StateChange::new(
                ProcessState::Failed,
                failed,
                Some("upstream timeout".to_string()),
            ),
        ];
        doc
    }

    #[test]
    fn test_round_trip_preserves_every_field() {
        let doc = sample();
        let json = serde_json::to_string(&doc).expect("serialization failed");
        let back: ProcessDocument = serde_json::from_str(&json).expect("deserialization failed");
        assert_eq!(doc, back);
        assert_eq!(back.history.len(), 2);
        assert_eq!(back.metadata.len(), 2);
    }

    #[test]
    fn test_wire_shape() {
        let value = sample().to_value().unwrap();
        assert_eq!(value["_id"], "process:2024-01-15");
        assert_eq!(value["_rev"], "2-abc");
        assert_eq!(value["processId"], "p1");
        assert_eq!(value["state"], "failed");
        assert_eq!(value["errorMessage"], "upstream timeout");
        assert_eq!(value["createdAt"], "2024-01-15T09:30:00Z");
        assert_eq!(value["history"][1]["errorMessage"], "upstream timeout");
        assert!(value["history"][0].get("errorMessage").is_none());
    }

    #[test]
    fn test_new_document_omits_store_fields() {
        let value = ProcessDocument::new("p1", ProcessState::Started)
            .to_value()
            .unwrap();
        assert!(value.get("_id").is_none());
        assert!(value.get("_rev").is_none());
        assert!(value.get("createdAt").is_none());
        assert_eq!(value["history"], json!([]));
    }

    #[test]
    fn test_minimal_body_deserializes() {
        let doc = ProcessDocument::from_value(json!({
            "_id": "a",
            "processId": "a",
            "state": "running"
        }))
        .unwrap();
        assert_eq!(doc.state, ProcessState::Running);
        assert!(doc.history.is_empty());
        assert!(doc.metadata.is_empty());
        assert!(doc.revision().is_none());
    }

    #[test]
    fn test_empty_revision_is_absent() {
        let doc = ProcessDocument::new("p1", ProcessState::Started).with_revision("");
        assert!(doc.revision().is_none());
        let doc = doc.with_revision("1-a");
        assert_eq!(doc.revision(), Some("1-a"));
    }

    #[test]
    fn test_state_parsing() {
        assert_eq!("running".parse::<ProcessState>().unwrap(), ProcessState::Running);
        assert_eq!("FAILED".parse::<ProcessState>().unwrap(), ProcessState::Failed);
        assert!("paused".parse::<ProcessState>().is_err());
        for state in ProcessState::ALL {
            assert_eq!(state.to_string().parse::<ProcessState>().unwrap(), state);
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(ProcessState::Successful.is_terminal());
        assert!(ProcessState::Cancelled.is_terminal());
        assert!(!ProcessState::Running.is_terminal());
    }

    #[test]
    fn test_invalid_state_is_rejected() {
        let err = ProcessDocument::from_value(json!({"processId": "a", "state": "paused"}));
        assert!(matches!(err, Err(CoreError::JsonError(_))));
    }
}
