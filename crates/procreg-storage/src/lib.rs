//! # procreg-storage
//!
//! Backing store abstraction for the process registry.
//!
//! This crate defines the contract every document store must honour. It does
//! not contain any implementations - those are provided by separate crates
//! (`procreg-db-memory`, `procreg-db-couch`).
//!
//! ## Overview
//!
//! The main trait is [`DocumentStore`], which covers:
//! - Revisioned document CRUD with conflict detection
//! - Selector queries and full enumeration as row streams
//! - Index creation, listing and deletion
//!
//! [`StoreConnector`] opens a store for a named database.
//!
//! ## Example
//!
//! ```ignore
//! use futures_util::TryStreamExt;
//! use procreg_storage::{DocumentStore, Selector, StorageError};
//!
//! async fn running_ids(store: &dyn DocumentStore) -> Result<Vec<String>, StorageError> {
//!     let rows = store.find(&Selector::field_eq("state", "running")).await?;
//!     rows.map_ok(|row| row.id).try_collect().await
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::{DocumentStore, StoreConnector};
pub use types::{DESIGN_DOC_PREFIX, Row, RowStream, Selector, is_design_doc};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shareable store trait object.
pub type DynStore = std::sync::Arc<dyn DocumentStore>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use procreg_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::traits::{DocumentStore, StoreConnector};
    pub use crate::types::{DESIGN_DOC_PREFIX, Row, RowStream, Selector, is_design_doc};
    pub use crate::{DynStore, StorageResult};
}
