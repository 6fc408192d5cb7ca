use std::path::PathBuf;

use clap::builder::NonEmptyStringValueParser;
use clap::{Parser, Subcommand, ValueEnum};
use procreg_core::{IndexType, ProcessState};

#[derive(Parser)]
#[command(name = "procreg")]
#[command(about = "procreg: audit-tracked process documents on CouchDB")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ./procreg.toml when present)
    #[arg(short, long, global = true, env = "PROCREG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database name (overrides config)
    #[arg(short, long, global = true, value_parser = NonEmptyStringValueParser::new())]
    pub database: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Save a process document, appending to its history
    Save(SaveArgs),
    /// Read a process document by id
    Get(GetArgs),
    /// List process documents, optionally by state
    List(ListArgs),
    /// Delete a process document at a revision
    Delete(DeleteArgs),
    /// Manage indexes
    Index(IndexArgs),
    /// Export every document of the database to JSON files
    Export(ExportArgs),
    /// Inspect CLI configuration
    Config(ConfigArgs),
}

#[derive(clap::Args)]
pub struct SaveArgs {
    /// Process identifier; builds the document from flags
    #[arg(long, conflicts_with = "file")]
    pub process_id: Option<String>,
    /// Document id (defaults to the process id)
    #[arg(long)]
    pub id: Option<String>,
    /// Process state
    #[arg(long)]
    pub state: Option<ProcessState>,
    /// Free-text description
    #[arg(long)]
    pub description: Option<String>,
    /// Error message for failed processes
    #[arg(long)]
    pub error_message: Option<String>,
    /// Current revision; the document is then written as given
    #[arg(long)]
    pub revision: Option<String>,
    /// Metadata entry; values are parsed as JSON when possible
    #[arg(long = "meta", value_name = "KEY=VALUE")]
    pub metadata: Vec<String>,
    /// Path to a JSON document (reads from stdin if neither --file nor --process-id is given)
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct GetArgs {
    /// Document id
    pub id: String,
}

#[derive(clap::Args)]
pub struct ListArgs {
    /// Only documents in this state
    #[arg(long)]
    pub state: Option<ProcessState>,
}

#[derive(clap::Args)]
pub struct DeleteArgs {
    /// Document id
    pub id: String,
    /// Current revision
    pub revision: String,
}

#[derive(clap::Args)]
pub struct IndexArgs {
    #[command(subcommand)]
    pub command: IndexCommands,
}

#[derive(Subcommand)]
pub enum IndexCommands {
    /// Create an index unless an equal one exists
    Ensure(IndexSpecArgs),
    /// Create an index
    Create(IndexSpecArgs),
    /// List indexes
    List,
    /// Delete an index
    Delete(IndexDeleteArgs),
}

#[derive(clap::Args)]
pub struct IndexSpecArgs {
    /// Indexed fields, in order
    #[arg(required = true)]
    pub fields: Vec<String>,
    /// Index name
    #[arg(long)]
    pub name: Option<String>,
    /// Index type
    #[arg(long = "type", default_value = "json")]
    pub index_type: IndexType,
}

#[derive(clap::Args)]
pub struct IndexDeleteArgs {
    /// Owning design document (e.g. _design/a5f4711f)
    pub design_doc: String,
    /// Index name
    pub name: String,
}

#[derive(clap::Args)]
pub struct ExportArgs {
    /// Output directory (overrides config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective config with secrets masked
    Show,
}
