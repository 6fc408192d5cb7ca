//! In-memory document store for procreg.
//!
//! Implements the full [`DocumentStore`](procreg_storage::DocumentStore)
//! contract - revisions, conflicts, selector queries, primary-key ordered
//! enumeration and design-document backed indexes - without a network. It is
//! the fake used by the registry test suites and supports fault injection for
//! exercising error paths.

mod factory;
mod storage;

pub use factory::InMemoryConnector;
pub use storage::InMemoryStore;
