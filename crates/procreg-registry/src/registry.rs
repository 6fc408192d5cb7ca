//! Document lifecycle: save, get, delete and close.

use procreg_core::{ProcessDocument, now_utc};
use procreg_storage::{DynStore, StorageError};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::{RegistryError, RegistryResult};

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub ok: bool,
    pub id: String,
    pub new_revision: String,
}

/// Audit-tracked process registry over a single store connection.
///
/// The registry holds no state besides the connection and adds no locking;
/// concurrent use is as safe as the underlying store.
#[derive(Clone)]
pub struct ProcessRegistry {
    store: DynStore,
}

impl std::fmt::Debug for ProcessRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRegistry")
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

impl ProcessRegistry {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DynStore {
        &self.store
    }

    /// Saves a document, accumulating its state history.
    ///
    /// Without a caller-supplied revision the current document is fetched
    /// first: its revision, `createdAt` and history are adopted and the new
    /// state is appended. A missing document starts a fresh history. Any
    /// other fetch failure aborts the save.
    ///
    /// With a revision the document is written as given.
    ///
    /// On success `doc` reflects what was stored, including the new revision.
    /// On failure only a defaulted id is written back.
    ///
    /// # Errors
    ///
    /// Returns a conflict if the revision is stale, and surfaces connectivity
    /// and serialization failures unchanged. Nothing is retried.
    #[instrument(skip(self, doc), fields(process_id = %doc.process_id, state = %doc.state))]
    pub async fn save(&self, doc: &mut ProcessDocument) -> RegistryResult<SaveOutcome> {
        if doc.id.is_empty() {
            if doc.process_id.is_empty() {
                return Err(RegistryError::validation(
                    "document needs an id or a processId",
                ));
            }
            doc.id = doc.process_id.clone();
        }

        // Merge into a copy so a failed write leaves the caller's document as it was.
        let mut staged = doc.clone();
        let mut now = now_utc();
        if staged.revision().is_none() {
            match self.store.get(&staged.id).await {
                Ok(body) => {
                    let existing = ProcessDocument::from_value(body).map_err(StorageError::from)?;
                    // Keep history chronological if the clock stepped back.
                    if let Some(last) = existing.latest_change() {
                        now = now.max(last.timestamp);
                    }
                    staged.revision = existing.revision;
                    staged.created_at = existing
                        .created_at
                        .or_else(|| existing.history.first().map(|change| change.timestamp))
                        .or(Some(now));
                    staged.history = existing.history;
                    staged.history.push(staged.state_change(now));
                }
                Err(err) if err.is_not_found() => {
                    debug!(id = %staged.id, "no stored document, starting history");
                    staged.revision = None;
                    staged.created_at = Some(now);
                    staged.history = vec![staged.state_change(now)];
                }
                Err(err) => return Err(err.into()),
            }
        } else if let Some(last) = staged.latest_change() {
            now = now.max(last.timestamp);
        }
        staged.updated_at = Some(now);

        let body = staged.to_value()?;
        let revision = self.store.put(&staged.id, &body).await?;
        info!(id = %staged.id, revision = %revision, history = staged.history.len(), "saved process");
        staged.revision = Some(revision.clone());
        *doc = staged;

        Ok(SaveOutcome {
            ok: true,
            id: doc.id.clone(),
            new_revision: revision,
        })
    }

    /// Fetches and decodes a document.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the document is absent; other store
    /// failures carry the underlying status.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> RegistryResult<ProcessDocument> {
        let body = self.store.get(id).await?;
        Ok(ProcessDocument::from_value(body).map_err(StorageError::from)?)
    }

    /// Deletes a document at the given revision.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str, revision: &str) -> RegistryResult<()> {
        if revision.is_empty() {
            return Err(RegistryError::validation("a revision is required to delete"));
        }
        self.store.delete(id, revision).await?;
        info!(id, revision, "deleted process");
        Ok(())
    }

    /// Releases the store connection. Call at most once.
    pub async fn close(&self) -> RegistryResult<()> {
        self.store.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procreg_core::ProcessState;
    use procreg_db_memory::InMemoryStore;
    use std::sync::Arc;

    fn registry() -> ProcessRegistry {
        ProcessRegistry::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn test_save_requires_some_identifier() {
        let mut doc = ProcessDocument::new("", ProcessState::Pending);
        let err = registry().save(&mut doc).await.unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_save_writes_back_stored_state() {
        let mut doc = ProcessDocument::new("p1", ProcessState::Started);
        let outcome = registry().save(&mut doc).await.unwrap();
        assert!(outcome.ok);
        assert_eq!(doc.revision.as_deref(), Some(outcome.new_revision.as_str()));
        assert_eq!(doc.created_at, doc.updated_at);
        assert_eq!(doc.history.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_requires_revision() {
        let err = registry().delete("p1", "").await.unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    #[test]
    fn test_save_outcome_wire_shape() {
        let outcome = SaveOutcome {
            ok: true,
            id: "p1".into(),
            new_revision: "1-a".into(),
        };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({"ok": true, "id": "p1", "newRevision": "1-a"})
        );
    }
}
