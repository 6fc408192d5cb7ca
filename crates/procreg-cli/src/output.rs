use anyhow::Result;
use colored::Colorize;
use procreg_core::{IndexInfo, ProcessDocument, ProcessState, format_rfc3339};
use procreg_registry::ExportReport;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

fn colored_state(state: ProcessState) -> String {
    match state {
        ProcessState::Successful => state.as_str().green().to_string(),
        ProcessState::Failed => state.as_str().red().to_string(),
        ProcessState::Cancelled => state.as_str().yellow().to_string(),
        _ => state.as_str().cyan().to_string(),
    }
}

fn timestamp(value: Option<&time::OffsetDateTime>) -> String {
    value.map(format_rfc3339).unwrap_or_else(|| "-".into())
}

fn render(builder: Builder) -> String {
    builder.build().with(Style::rounded()).to_string()
}

pub fn print_documents(docs: &[ProcessDocument]) {
    if docs.is_empty() {
        println!("No processes found.");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(["ID", "Process", "State", "Updated", "Changes"]);
    for doc in docs {
        builder.push_record([
            doc.id.clone(),
            doc.process_id.clone(),
            colored_state(doc.state),
            timestamp(doc.updated_at.as_ref()),
            doc.history.len().to_string(),
        ]);
    }
    println!("{}", render(builder));
    println!("Total: {}", docs.len());
}

pub fn print_document(doc: &ProcessDocument) {
    println!("{} {}", "Process:".cyan(), doc.id.cyan());
    let mut fields = Builder::default();
    fields.push_record(["Revision".to_string(), doc.revision.clone().unwrap_or_default()]);
    fields.push_record(["Process".to_string(), doc.process_id.clone()]);
    fields.push_record(["State".to_string(), colored_state(doc.state)]);
    if !doc.description.is_empty() {
        fields.push_record(["Description".to_string(), doc.description.clone()]);
    }
    if let Some(message) = &doc.error_message {
        fields.push_record(["Error".to_string(), message.clone()]);
    }
    fields.push_record(["Created".to_string(), timestamp(doc.created_at.as_ref())]);
    fields.push_record(["Updated".to_string(), timestamp(doc.updated_at.as_ref())]);
    for (key, value) in &doc.metadata {
        fields.push_record([format!("meta.{key}"), value.to_string()]);
    }
    println!("{}", render(fields));

    if doc.history.is_empty() {
        return;
    }
    let mut history = Builder::default();
    history.push_record(["#", "State", "Timestamp", "Error"]);
    for (i, change) in doc.history.iter().enumerate() {
        history.push_record([
            (i + 1).to_string(),
            colored_state(change.state),
            format_rfc3339(&change.timestamp),
            change.error_message.clone().unwrap_or_default(),
        ]);
    }
    println!("{}", render(history));
}

pub fn print_indexes(indexes: &[IndexInfo]) {
    let mut builder = Builder::default();
    builder.push_record(["Name", "Type", "Fields", "Design Doc"]);
    for index in indexes {
        builder.push_record([
            index.name.clone(),
            index.index_type.to_string(),
            index.fields.join(", "),
            index.design_doc.clone().unwrap_or_else(|| "-".into()),
        ]);
    }
    println!("{}", render(builder));
}

pub fn print_report(report: &ExportReport) {
    let mut builder = Builder::default();
    builder.push_record(["Database".to_string(), report.database.clone()]);
    builder.push_record(["Directory".to_string(), report.directory.display().to_string()]);
    builder.push_record(["Exported".to_string(), report.exported.to_string()]);
    builder.push_record(["Design docs skipped".to_string(), report.skipped_design_docs.to_string()]);
    builder.push_record(["Failed".to_string(), report.failures.len().to_string()]);
    println!("{}", render(builder));

    if report.failures.is_empty() {
        return;
    }
    let mut failures = Builder::default();
    failures.push_record(["ID", "Reason"]);
    for failure in &report.failures {
        failures.push_record([
            failure.id.clone().unwrap_or_else(|| "?".into()),
            failure.reason.clone(),
        ]);
    }
    println!("{}", render(failures));
}
