//! Storage traits for the backing store abstraction.
//!
//! This module defines the core traits that all store backends must implement.

use async_trait::async_trait;
use procreg_core::{IndexDescriptor, IndexInfo, IndexOutcome};
use serde_json::Value;

use crate::DynStore;
use crate::error::StorageError;
use crate::types::{RowStream, Selector};

/// The contract every document store backend must implement.
///
/// A store holds schema-free JSON documents identified by `_id` and guarded by
/// an opaque `_rev` token. Implementations must be thread-safe
/// (`Send + Sync`); this layer adds no locking of its own.
///
/// # Example
///
/// ```ignore
/// use procreg_storage::{DocumentStore, StorageError};
///
/// async fn touch(store: &dyn DocumentStore, id: &str) -> Result<String, StorageError> {
///     let mut doc = store.get(id).await?;
///     doc["touched"] = serde_json::json!(true);
///     store.put(id, &doc).await
/// }
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // ==================== Documents ====================

    /// Reads the current body of a document, including `_id` and `_rev`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the document does not exist.
    async fn get(&self, id: &str) -> Result<Value, StorageError>;

    /// Writes a document body and returns the new revision.
    ///
    /// Updating an existing document requires the body's `_rev` to equal the
    /// current revision. Creating a document requires `_rev` to be absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` on a missing, stale or unexpected `_rev`.
    async fn put(&self, id: &str, doc: &Value) -> Result<String, StorageError>;

    /// Deletes a document if `revision` is its current revision.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the document does not exist.
    /// Returns `StorageError::Conflict` if the revision does not match.
    async fn delete(&self, id: &str, revision: &str) -> Result<(), StorageError>;

    // ==================== Queries ====================

    /// Streams the documents matching a selector, bodies included.
    ///
    /// Row order is whatever the store's query evaluator produces.
    async fn find(&self, selector: &Selector) -> Result<RowStream, StorageError>;

    /// Streams every entry in primary key order, design documents included.
    async fn all_docs(&self, include_docs: bool) -> Result<RowStream, StorageError>;

    // ==================== Indexes ====================

    /// Creates an index. Identical definitions report `AlreadyExisted`.
    async fn create_index(
        &self,
        descriptor: &IndexDescriptor,
    ) -> Result<IndexOutcome, StorageError>;

    /// Lists all indexes, including the store's special primary index.
    async fn list_indexes(&self) -> Result<Vec<IndexInfo>, StorageError>;

    /// Deletes an index by owning design document and name.
    async fn delete_index(&self, design_doc: &str, name: &str) -> Result<(), StorageError>;

    // ==================== Lifecycle ====================

    /// Releases the connection. Subsequent calls fail with `Connection`.
    async fn close(&self) -> Result<(), StorageError>;

    /// Returns the name of this store backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

/// Opens stores for named databases.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Connects to `database`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store cannot be reached and
    /// `StorageError::NotFound` if the database does not exist.
    async fn connect(&self, database: &str) -> Result<DynStore, StorageError>;
}
