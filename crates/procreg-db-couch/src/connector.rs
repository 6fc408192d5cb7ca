use std::sync::Arc;

use async_trait::async_trait;
use procreg_storage::{DynStore, StorageError, StoreConnector};

use crate::config::CouchConfig;
use crate::storage::CouchStore;

/// Opens `CouchStore`s on one server.
#[derive(Debug, Clone)]
pub struct CouchConnector {
    config: CouchConfig,
}

impl CouchConnector {
    pub fn new(config: CouchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CouchConfig {
        &self.config
    }
}

#[async_trait]
impl StoreConnector for CouchConnector {
    async fn connect(&self, database: &str) -> Result<DynStore, StorageError> {
        let store = CouchStore::connect(&self.config, database).await?;
        Ok(Arc::new(store))
    }
}
