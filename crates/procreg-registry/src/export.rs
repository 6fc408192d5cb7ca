//! Bulk export of a database to one JSON file per document.
//!
//! Export is best effort per document: a row that cannot be read, a body
//! that cannot be encoded or a file that cannot be written is logged,
//! recorded in the report and skipped. Failing to connect, to create the
//! output directory or to advance the cursor aborts the export.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use procreg_storage::{DocumentStore, Row, StorageError, StoreConnector, is_design_doc};
use serde::Serialize;
use tokio::fs;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::sanitize::sanitize_filename;

/// Callback receiving the running count of exported documents.
pub type ProgressFn = Arc<dyn Fn(usize) + Send + Sync>;

/// A document that was skipped during export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportFailure {
    /// Document id, when it could be read.
    pub id: Option<String>,
    pub reason: String,
}

impl ExportFailure {
    fn new(id: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            id,
            reason: reason.into(),
        }
    }
}

/// Summary of a finished export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub database: String,
    pub directory: PathBuf,
    pub exported: usize,
    pub skipped_design_docs: usize,
    pub failures: Vec<ExportFailure>,
}

impl ExportReport {
    fn new(database: &str, directory: PathBuf) -> Self {
        Self {
            database: database.to_string(),
            directory,
            exported: 0,
            skipped_design_docs: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Writes every document of a database below an output directory.
///
/// Files land at `<output>/<database>/<sanitized id>.json` as 2-space
/// indented JSON, replacing any existing file.
#[derive(Clone)]
pub struct BulkExporter {
    connector: Arc<dyn StoreConnector>,
    config: RegistryConfig,
    progress: Option<ProgressFn>,
}

impl fmt::Debug for BulkExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkExporter")
            .field("config", &self.config)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl BulkExporter {
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            connector,
            config: RegistryConfig::default(),
            progress: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a callback invoked at every progress interval.
    #[must_use]
    pub fn with_progress(mut self, progress: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Exports `database` into `output_dir/database`.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be reached, the directory cannot be created
    /// or the enumeration cursor breaks. Per-document failures are reported
    /// in [`ExportReport::failures`] instead.
    #[instrument(skip(self, output_dir), fields(output = %output_dir.display()))]
    pub async fn export(&self, database: &str, output_dir: &Path) -> RegistryResult<ExportReport> {
        if database.is_empty() {
            return Err(RegistryError::validation("database name must not be empty"));
        }

        let store = self.connector.connect(database).await?;
        let directory = output_dir.join(database);
        let mut report = ExportReport::new(database, directory.clone());

        let result = match fs::create_dir_all(&directory).await {
            Ok(()) => self.export_rows(store.as_ref(), &mut report).await,
            Err(source) => Err(RegistryError::io(&directory, source)),
        };
        if let Err(err) = store.close().await {
            debug!(error = %err, "closing export connection failed");
        }
        result?;

        info!(
            count = report.exported,
            failed = report.failures.len(),
            design_docs = report.skipped_design_docs,
            "export finished"
        );
        Ok(report)
    }

    async fn export_rows(
        &self,
        store: &dyn DocumentStore,
        report: &mut ExportReport,
    ) -> RegistryResult<()> {
        let mut rows = store.all_docs(true).await?;
        while let Some(item) = rows.next().await {
            let row = match item {
                Ok(row) => row,
                Err(StorageError::RowScan { id, message }) => {
                    warn!(id = ?id, error = %message, "skipping unreadable row");
                    report.failures.push(ExportFailure::new(id, message));
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            if is_design_doc(&row.id) {
                report.skipped_design_docs += 1;
                continue;
            }

            match write_document(&report.directory, row).await {
                Ok(path) => {
                    trace!(path = %path.display(), "exported document");
                    report.exported += 1;
                    self.signal_progress(report.exported);
                }
                Err(failure) => {
                    warn!(id = ?failure.id, error = %failure.reason, "skipping document");
                    report.failures.push(failure);
                }
            }
        }
        Ok(())
    }

    fn signal_progress(&self, exported: usize) {
        let interval = self.config.progress_interval;
        if interval == 0 || exported % interval != 0 {
            return;
        }
        info!(count = exported, "export progress");
        if let Some(progress) = &self.progress {
            progress(exported);
        }
    }
}

async fn write_document(directory: &Path, row: Row) -> Result<PathBuf, ExportFailure> {
    let Row { id, doc } = row;
    let Some(body) = doc else {
        return Err(ExportFailure::new(Some(id), "row without document body"));
    };

    let name = sanitize_filename(&id);
    if name.is_empty() {
        return Err(ExportFailure::new(Some(id), "id maps to an empty file name"));
    }
    let path = directory.join(format!("{name}.json"));

    let bytes = match serde_json::to_vec_pretty(&body) {
        Ok(bytes) => bytes,
        Err(e) => return Err(ExportFailure::new(Some(id), e.to_string())),
    };
    if let Err(e) = fs::write(&path, bytes).await {
        return Err(ExportFailure::new(
            Some(id),
            format!("cannot write {}: {e}", path.display()),
        ));
    }
    Ok(path)
}
