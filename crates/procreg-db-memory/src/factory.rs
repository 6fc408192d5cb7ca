use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use procreg_storage::{DynStore, StorageError, StoreConnector};

use crate::InMemoryStore;

/// Connector over a set of named in-memory databases.
///
/// Every `connect` hands out a fresh connection to the shared data, so a
/// consumer closing its connection leaves the database usable.
#[derive(Debug, Default)]
pub struct InMemoryConnector {
    databases: RwLock<HashMap<String, Arc<InMemoryStore>>>,
    unreachable: AtomicBool,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the database named `name`, creating it if absent.
    pub async fn database(&self, name: &str) -> Arc<InMemoryStore> {
        let mut databases = self.databases.write().await;
        Arc::clone(
            databases
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(InMemoryStore::new())),
        )
    }

    /// Makes every `connect` fail as if the server could not be reached.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::Release);
    }
}

#[async_trait]
impl StoreConnector for InMemoryConnector {
    async fn connect(&self, database: &str) -> Result<DynStore, StorageError> {
        if self.unreachable.load(Ordering::Acquire) {
            return Err(StorageError::connection(format!(
                "cannot reach store for database '{database}'"
            )));
        }
        let databases = self.databases.read().await;
        let store = databases
            .get(database)
            .ok_or_else(|| StorageError::not_found(database))?;
        Ok(Arc::new(store.connection()))
    }
}
