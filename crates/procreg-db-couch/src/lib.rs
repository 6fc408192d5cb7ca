//! CouchDB storage backend for procreg.
//!
//! This crate provides a CouchDB implementation of the `DocumentStore` trait
//! from `procreg-storage`, speaking the CouchDB HTTP API through reqwest.
//!
//! # Example
//!
//! ```ignore
//! use procreg_db_couch::{CouchConfig, CouchStore};
//! use procreg_storage::DocumentStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CouchConfig::new("http://localhost:5984")
//!     .with_credentials("admin", "secret")
//!     .with_page_size(200);
//!
//! let store = CouchStore::connect(&config, "processes").await?;
//! let doc = store.get("nightly-import").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Connection settings
//! - `client`: Authenticated request construction and response mapping
//! - `cursor`: Paged `_all_docs` / `_find` row streams
//! - `storage`: The `DocumentStore` implementation
//! - `connector`: Opens stores for named databases

mod client;
pub mod config;
mod connector;
mod cursor;
mod error;
mod storage;

pub use config::CouchConfig;
pub use connector::CouchConnector;
pub use error::mask_password;
pub use storage::CouchStore;

// Re-export storage traits for convenience
pub use procreg_storage::{DocumentStore, StorageError, StoreConnector};
