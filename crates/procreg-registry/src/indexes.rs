//! Index management.

use procreg_core::{IndexDescriptor, IndexInfo, IndexOutcome};
use tracing::{debug, info, instrument};

use crate::error::{RegistryError, RegistryResult};
use crate::registry::ProcessRegistry;

impl ProcessRegistry {
    /// Creates the index unless an index with the same type and ordered
    /// fields already exists.
    ///
    /// The check and the create are not atomic. If a concurrent caller wins
    /// the race and the store answers with a conflict, the indexes are listed
    /// again and an equal one counts as already existing.
    #[instrument(skip(self, descriptor), fields(fields = ?descriptor.fields, index_type = %descriptor.index_type))]
    pub async fn ensure_index(&self, descriptor: &IndexDescriptor) -> RegistryResult<IndexOutcome> {
        descriptor.validate()?;

        if self.has_equal_index(descriptor).await? {
            debug!("equal index already present");
            return Ok(IndexOutcome::AlreadyExisted);
        }

        match self.store().create_index(descriptor).await {
            Ok(outcome) => {
                info!(%outcome, "ensured index");
                Ok(outcome)
            }
            Err(err) if err.is_conflict() => {
                if self.has_equal_index(descriptor).await? {
                    debug!("index created concurrently");
                    Ok(IndexOutcome::AlreadyExisted)
                } else {
                    Err(err.into())
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Creates an index without checking for an equal one first.
    #[instrument(skip(self, descriptor), fields(fields = ?descriptor.fields, index_type = %descriptor.index_type))]
    pub async fn create_index(&self, descriptor: &IndexDescriptor) -> RegistryResult<IndexOutcome> {
        descriptor.validate()?;
        let outcome = self.store().create_index(descriptor).await?;
        info!(%outcome, "created index");
        Ok(outcome)
    }

    pub async fn list_indexes(&self) -> RegistryResult<Vec<IndexInfo>> {
        Ok(self.store().list_indexes().await?)
    }

    /// Deletes an index. The store decides which indexes are protected.
    #[instrument(skip(self))]
    pub async fn delete_index(&self, design_doc: &str, name: &str) -> RegistryResult<()> {
        if name.is_empty() {
            return Err(RegistryError::validation("index name must not be empty"));
        }
        self.store().delete_index(design_doc, name).await?;
        info!("deleted index");
        Ok(())
    }

    async fn has_equal_index(&self, descriptor: &IndexDescriptor) -> RegistryResult<bool> {
        let existing = self.store().list_indexes().await?;
        Ok(existing.iter().any(|info| descriptor.matches(info)))
    }
}
