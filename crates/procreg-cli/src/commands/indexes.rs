use anyhow::{Context, Result};
use colored::Colorize;
use procreg_core::{IndexDescriptor, IndexOutcome};
use procreg_registry::ProcessRegistry;
use serde_json::json;

use crate::cli::{IndexSpecArgs, OutputFormat};
use crate::output::{print_indexes, print_json, print_success};

fn descriptor(args: &IndexSpecArgs) -> IndexDescriptor {
    let mut descriptor = IndexDescriptor::new(args.fields.iter().cloned()).with_type(args.index_type);
    if let Some(name) = &args.name {
        descriptor = descriptor.with_name(name.clone());
    }
    descriptor
}

fn report(args: &IndexSpecArgs, outcome: IndexOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&json!({ "result": outcome })),
        OutputFormat::Table => {
            print_success(&format!(
                "Index on [{}] {}",
                args.fields.join(", ").cyan(),
                outcome
            ));
            Ok(())
        }
    }
}

pub async fn ensure(registry: &ProcessRegistry, args: &IndexSpecArgs, format: OutputFormat) -> Result<()> {
    let outcome = registry
        .ensure_index(&descriptor(args))
        .await
        .context("Failed to ensure index")?;
    report(args, outcome, format)
}

pub async fn create(registry: &ProcessRegistry, args: &IndexSpecArgs, format: OutputFormat) -> Result<()> {
    let outcome = registry
        .create_index(&descriptor(args))
        .await
        .context("Failed to create index")?;
    report(args, outcome, format)
}

pub async fn list(registry: &ProcessRegistry, format: OutputFormat) -> Result<()> {
    let indexes = registry.list_indexes().await?;
    match format {
        OutputFormat::Json => print_json(&indexes)?,
        OutputFormat::Table => print_indexes(&indexes),
    }
    Ok(())
}

pub async fn delete(registry: &ProcessRegistry, design_doc: &str, name: &str) -> Result<()> {
    registry
        .delete_index(design_doc, name)
        .await
        .with_context(|| format!("Failed to delete index {name}"))?;
    print_success(&format!("Deleted index {}", name.cyan()));
    Ok(())
}
