//! # procreg-registry
//!
//! The policy layer that turns a revisioned document store into an
//! audit-tracked process registry.
//!
//! - [`ProcessRegistry`]: save/get/delete with conflict detection and
//!   append-only history, state-filtered listing and index management.
//! - [`BulkExporter`]: writes every document of a database to one JSON file
//!   per document, skipping (and reporting) documents that cannot be read or
//!   written.
//! - [`sanitize_filename`]: maps document ids onto safe file names.
//!
//! ## Example
//!
//! ```ignore
//! use procreg_core::{ProcessDocument, ProcessState};
//! use procreg_registry::ProcessRegistry;
//!
//! # async fn example(store: procreg_storage::DynStore) -> Result<(), procreg_registry::RegistryError> {
//! let registry = ProcessRegistry::new(store);
//! let mut doc = ProcessDocument::new("nightly-import", ProcessState::Running);
//! let saved = registry.save(&mut doc).await?;
//! assert_eq!(saved.id, "nightly-import");
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod export;
mod indexes;
mod query;
mod registry;
mod sanitize;

pub use config::RegistryConfig;
pub use error::{RegistryError, RegistryResult};
pub use export::{BulkExporter, ExportFailure, ExportReport, ProgressFn};
pub use registry::{ProcessRegistry, SaveOutcome};
pub use sanitize::{MAX_FILENAME_BYTES, sanitize_filename};
