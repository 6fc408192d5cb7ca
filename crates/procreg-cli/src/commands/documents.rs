use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use procreg_core::{ProcessDocument, ProcessState};
use procreg_registry::ProcessRegistry;
use serde_json::Value;

use crate::cli::{OutputFormat, SaveArgs};
use crate::output::{print_document, print_documents, print_json, print_success};

fn read_document(file: Option<&Path>) -> Result<ProcessDocument> {
    let content = match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            buf
        }
    };
    serde_json::from_str(&content).context("Invalid process document")
}

fn parse_metadata(entry: &str) -> Result<(String, Value)> {
    let (key, raw) = entry
        .split_once('=')
        .with_context(|| format!("Invalid metadata \"{entry}\". Expected format: key=value"))?;
    anyhow::ensure!(!key.is_empty(), "Metadata key must not be empty");
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Builds the document to save from a file, stdin or flags.
pub fn build_document(args: &SaveArgs) -> Result<ProcessDocument> {
    let mut doc = match &args.process_id {
        Some(process_id) => {
            let state = args
                .state
                .context("--state is required together with --process-id")?;
            ProcessDocument::new(process_id.clone(), state)
        }
        None => read_document(args.file.as_deref())?,
    };

    if let Some(id) = &args.id {
        doc.id = id.clone();
    }
    if let Some(state) = args.state {
        doc.state = state;
    }
    if let Some(description) = &args.description {
        doc.description = description.clone();
    }
    if let Some(message) = &args.error_message {
        doc.error_message = Some(message.clone());
    }
    if let Some(revision) = &args.revision {
        doc.revision = Some(revision.clone());
    }
    for entry in &args.metadata {
        let (key, value) = parse_metadata(entry)?;
        doc.metadata.insert(key, value);
    }
    Ok(doc)
}

pub async fn save(registry: &ProcessRegistry, args: &SaveArgs, format: OutputFormat) -> Result<()> {
    let mut doc = build_document(args)?;
    let outcome = registry.save(&mut doc).await?;
    match format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Table => print_success(&format!(
            "Saved {} as {} (revision {})",
            outcome.id.cyan(),
            doc.state,
            outcome.new_revision
        )),
    }
    Ok(())
}

pub async fn get(registry: &ProcessRegistry, id: &str, format: OutputFormat) -> Result<()> {
    let doc = registry
        .get(id)
        .await
        .with_context(|| format!("Failed to read process {id}"))?;
    match format {
        OutputFormat::Json => print_json(&doc)?,
        OutputFormat::Table => print_document(&doc),
    }
    Ok(())
}

pub async fn list(
    registry: &ProcessRegistry,
    state: Option<ProcessState>,
    format: OutputFormat,
) -> Result<()> {
    let docs = match state {
        Some(state) => registry.list_by_state(state).await?,
        None => registry.list_all().await?,
    };
    match format {
        OutputFormat::Json => print_json(&docs)?,
        OutputFormat::Table => print_documents(&docs),
    }
    Ok(())
}

pub async fn delete(registry: &ProcessRegistry, id: &str, revision: &str) -> Result<()> {
    registry
        .delete(id, revision)
        .await
        .with_context(|| format!("Failed to delete process {id}"))?;
    print_success(&format!("Deleted {}", id.cyan()));
    Ok(())
}
