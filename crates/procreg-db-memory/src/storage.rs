use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::stream;
use serde_json::{Map, Value, json};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use procreg_core::{IndexDescriptor, IndexInfo, IndexOutcome, IndexType};
use procreg_storage::{
    DESIGN_DOC_PREFIX, DocumentStore, Row, RowStream, Selector, StorageError, is_design_doc,
};

const SPECIAL_INDEX: &str = "_all_docs";

#[derive(Debug, Clone)]
struct StoredDoc {
    generation: u64,
    revision: String,
    body: Value,
}

#[derive(Debug, Default)]
struct Faults {
    corrupt_rows: HashSet<String>,
    unavailable: bool,
    cursor_failure_after: Option<usize>,
}

#[derive(Debug, Default)]
struct State {
    docs: BTreeMap<String, StoredDoc>,
    indexes: Vec<IndexInfo>,
    faults: Faults,
}

impl State {
    /// Writes a body under `id`, enforcing revision checks, and returns the new revision.
    fn store_body(&mut self, id: &str, mut body: Value) -> Result<String, StorageError> {
        let incoming = body
            .get("_rev")
            .and_then(Value::as_str)
            .filter(|rev| !rev.is_empty())
            .map(str::to_owned);

        let generation = match (self.docs.get(id), incoming) {
            (Some(current), Some(rev)) if current.revision == rev => current.generation + 1,
            (None, None) => 1,
            (Some(_), _) | (None, Some(_)) => {
                return Err(StorageError::conflict(id, "Document update conflict."));
            }
        };

        let revision = format!("{generation}-{}", Uuid::new_v4().simple());
        let obj = body
            .as_object_mut()
            .ok_or_else(|| StorageError::validation("document body must be a JSON object"))?;
        obj.insert("_id".to_string(), Value::String(id.to_string()));
        obj.insert("_rev".to_string(), Value::String(revision.clone()));

        self.docs.insert(
            id.to_string(),
            StoredDoc {
                generation,
                revision: revision.clone(),
                body,
            },
        );
        Ok(revision)
    }

    /// Rewrites the design document owning `design_doc`, removing it when empty.
    fn sync_design_doc(&mut self, design_doc: &str) -> Result<(), StorageError> {
        let members: Map<String, Value> = self
            .indexes
            .iter()
            .filter(|idx| idx.design_doc.as_deref() == Some(design_doc))
            .map(|idx| {
                (
                    idx.name.clone(),
                    json!({"type": idx.index_type, "fields": idx.fields}),
                )
            })
            .collect();

        if members.is_empty() {
            self.docs.remove(design_doc);
            return Ok(());
        }

        let mut body = json!({"language": "query", "indexes": members});
        if let Some(current) = self.docs.get(design_doc) {
            body["_rev"] = Value::String(current.revision.clone());
        }
        self.store_body(design_doc, body).map(|_| ())
    }

    fn rows<'a>(
        &self,
        ids: impl Iterator<Item = &'a String>,
        include_docs: bool,
    ) -> Vec<Result<Row, StorageError>> {
        let mut rows = Vec::new();
        for id in ids {
            if self
                .faults
                .cursor_failure_after
                .is_some_and(|limit| rows.len() >= limit)
            {
                rows.push(Err(StorageError::connection("cursor interrupted")));
                break;
            }
            if self.faults.corrupt_rows.contains(id) {
                rows.push(Err(StorageError::row_scan(
                    Some(id.clone()),
                    "corrupt document body",
                )));
                continue;
            }
            let doc = include_docs
                .then(|| self.docs.get(id).map(|stored| stored.body.clone()))
                .flatten();
            rows.push(Ok(Row::new(id.clone(), doc)));
        }
        rows
    }
}

/// In-memory document store.
///
/// Clones of the shared data are handed out as separate connections via
/// [`InMemoryStore::connection`]; closing one connection does not affect the
/// others.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    closed: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens another connection to the same data.
    pub fn connection(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of stored entries, design documents included.
    pub async fn len(&self) -> usize {
        self.state.read().await.docs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Makes the row for `id` fail with a row scan error in every stream.
    pub async fn corrupt_row(&self, id: impl Into<String>) {
        self.state.write().await.faults.corrupt_rows.insert(id.into());
    }

    /// Makes every operation fail with a connection error while set.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.faults.unavailable = unavailable;
    }

    /// Makes streams fail as a cursor error after yielding `rows` entries.
    pub async fn fail_cursor_after(&self, rows: Option<usize>) {
        self.state.write().await.faults.cursor_failure_after = rows;
    }

    fn ensure_open(&self, state: &State) -> Result<(), StorageError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::connection("store connection is closed"));
        }
        if state.faults.unavailable {
            return Err(StorageError::connection("store is unavailable"));
        }
        Ok(())
    }
}

fn validate_id(id: &str) -> Result<(), StorageError> {
    if id.is_empty() {
        return Err(StorageError::validation("document id must not be empty"));
    }
    if id.starts_with('_') && !is_design_doc(id) {
        return Err(StorageError::validation(format!(
            "document id '{id}' uses a reserved prefix"
        )));
    }
    Ok(())
}

fn design_doc_id(design_doc: &str) -> String {
    if is_design_doc(design_doc) {
        design_doc.to_string()
    } else {
        format!("{DESIGN_DOC_PREFIX}{design_doc}")
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, id: &str) -> Result<Value, StorageError> {
        let state = self.state.read().await;
        self.ensure_open(&state)?;
        state
            .docs
            .get(id)
            .map(|stored| stored.body.clone())
            .ok_or_else(|| StorageError::not_found(id))
    }

    async fn put(&self, id: &str, doc: &Value) -> Result<String, StorageError> {
        validate_id(id)?;
        let mut state = self.state.write().await;
        self.ensure_open(&state)?;
        let revision = state.store_body(id, doc.clone())?;
        debug!(id, revision = %revision, "Stored document");
        Ok(revision)
    }

    async fn delete(&self, id: &str, revision: &str) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        self.ensure_open(&state)?;
        let current = state
            .docs
            .get(id)
            .ok_or_else(|| StorageError::not_found(id))?;
        if current.revision != revision {
            return Err(StorageError::conflict(id, "Document update conflict."));
        }
        state.docs.remove(id);
        debug!(id, "Deleted document");
        Ok(())
    }

    async fn find(&self, selector: &Selector) -> Result<RowStream, StorageError> {
        let state = self.state.read().await;
        self.ensure_open(&state)?;
        let matching: Vec<&String> = state
            .docs
            .iter()
            .filter(|(id, stored)| !is_design_doc(id) && selector.matches(&stored.body))
            .map(|(id, _)| id)
            .collect();
        let rows = state.rows(matching.into_iter(), true);
        Ok(Box::pin(stream::iter(rows)))
    }

    async fn all_docs(&self, include_docs: bool) -> Result<RowStream, StorageError> {
        let state = self.state.read().await;
        self.ensure_open(&state)?;
        let rows = state.rows(state.docs.keys(), include_docs);
        Ok(Box::pin(stream::iter(rows)))
    }

    async fn create_index(
        &self,
        descriptor: &IndexDescriptor,
    ) -> Result<IndexOutcome, StorageError> {
        descriptor.validate()?;
        let mut state = self.state.write().await;
        self.ensure_open(&state)?;

        let same_name = |idx: &IndexInfo| descriptor.name.as_deref() == Some(idx.name.as_str());
        if state
            .indexes
            .iter()
            .any(|idx| descriptor.matches(idx) && (descriptor.name.is_none() || same_name(idx)))
        {
            return Ok(IndexOutcome::AlreadyExisted);
        }
        if let Some(existing) = state.indexes.iter().find(|idx| same_name(*idx)) {
            return Err(StorageError::conflict(
                existing.name.clone(),
                "an index with this name already exists with a different definition",
            ));
        }

        let key = Uuid::new_v4().simple().to_string();
        let design_doc = format!("{DESIGN_DOC_PREFIX}{key}");
        let name = descriptor.name.clone().unwrap_or(key);
        state.indexes.push(IndexInfo {
            name: name.clone(),
            index_type: descriptor.index_type,
            fields: descriptor.fields.clone(),
            design_doc: Some(design_doc.clone()),
        });
        state.sync_design_doc(&design_doc)?;
        debug!(name = %name, design_doc = %design_doc, "Created index");
        Ok(IndexOutcome::Created)
    }

    async fn list_indexes(&self) -> Result<Vec<IndexInfo>, StorageError> {
        let state = self.state.read().await;
        self.ensure_open(&state)?;
        let special = IndexInfo {
            name: SPECIAL_INDEX.to_string(),
            index_type: IndexType::Special,
            fields: vec!["_id".to_string()],
            design_doc: None,
        };
        Ok(std::iter::once(special)
            .chain(state.indexes.iter().cloned())
            .collect())
    }

    async fn delete_index(&self, design_doc: &str, name: &str) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        self.ensure_open(&state)?;
        if name == SPECIAL_INDEX || design_doc.is_empty() {
            return Err(StorageError::permission(format!(
                "index '{name}' is managed by the store and cannot be deleted"
            )));
        }

        let design_doc = design_doc_id(design_doc);
        let position = state
            .indexes
            .iter()
            .position(|idx| idx.name == name && idx.design_doc.as_deref() == Some(design_doc.as_str()))
            .ok_or_else(|| StorageError::not_found(format!("{design_doc}/{name}")))?;
        state.indexes.remove(position);
        state.sync_design_doc(&design_doc)?;
        debug!(name, design_doc = %design_doc, "Deleted index");
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
