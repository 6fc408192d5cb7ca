//! State-filtered and full listings.
//!
//! Both listings stop at the first row that cannot be read: callers expect
//! a complete result set, not a best-effort one.

use futures_util::TryStreamExt;
use procreg_core::{ProcessDocument, ProcessState};
use procreg_storage::{Row, RowStream, Selector, StorageError, is_design_doc};
use tracing::{debug, instrument};

use crate::error::RegistryResult;
use crate::registry::ProcessRegistry;

impl ProcessRegistry {
    /// Lists documents currently in `state`, in the store's query order.
    #[instrument(skip(self))]
    pub async fn list_by_state(&self, state: ProcessState) -> RegistryResult<Vec<ProcessDocument>> {
        let rows = self
            .store()
            .find(&Selector::field_eq("state", state.as_str()))
            .await?;
        let docs = collect_documents(rows).await?;
        debug!(count = docs.len(), "listed processes by state");
        Ok(docs)
    }

    /// Lists every process document in primary key order.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> RegistryResult<Vec<ProcessDocument>> {
        let rows = self.store().all_docs(true).await?;
        let docs = collect_documents(rows).await?;
        debug!(count = docs.len(), "listed all processes");
        Ok(docs)
    }
}

async fn collect_documents(mut rows: RowStream) -> Result<Vec<ProcessDocument>, StorageError> {
    let mut docs = Vec::new();
    while let Some(row) = rows.try_next().await? {
        if is_design_doc(&row.id) {
            continue;
        }
        docs.push(decode_row(row)?);
    }
    Ok(docs)
}

fn decode_row(row: Row) -> Result<ProcessDocument, StorageError> {
    let Row { id, doc } = row;
    let Some(body) = doc else {
        return Err(StorageError::row_scan(Some(id), "row without document body"));
    };
    ProcessDocument::from_value(body).map_err(|e| StorageError::row_scan(Some(id), e.to_string()))
}
