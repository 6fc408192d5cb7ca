use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use procreg_db_couch::CouchConnector;
use procreg_registry::BulkExporter;

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::output::{print_json, print_report, print_success, print_warning};

pub async fn export(cfg: &AppConfig, output_dir: &Path, format: OutputFormat) -> Result<()> {
    let connector = CouchConnector::new(cfg.couch.clone());
    let exporter = BulkExporter::new(Arc::new(connector))
        .with_config(cfg.registry.clone())
        .with_progress(|count| eprintln!("{} {count} documents exported", "…".dimmed()));

    let report = exporter
        .export(&cfg.database, output_dir)
        .await
        .with_context(|| format!("Export of database {} failed", cfg.database))?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            print_report(&report);
            if report.is_complete() {
                print_success(&format!(
                    "Exported {} documents to {}",
                    report.exported,
                    report.directory.display().to_string().cyan()
                ));
            }
        }
    }
    if !report.is_complete() {
        print_warning(&format!(
            "{} documents could not be exported",
            report.failures.len()
        ));
    }
    Ok(())
}
