mod cli;
mod commands;
mod config;
mod observability;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use procreg_db_couch::{CouchConnector, StoreConnector};
use procreg_registry::ProcessRegistry;

use cli::{Cli, Commands, ConfigCommands, IndexCommands};
use config::AppConfig;
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = config::load_config(cli.config.as_deref())?;
    if let Some(database) = &cli.database {
        cfg.database = database.clone();
    }
    observability::init_tracing(&cfg.logging.level);
    let format = cli.format.unwrap_or_default();

    match &cli.command {
        Commands::Config(args) => match &args.command {
            ConfigCommands::Show => {
                println!("{}", "# effective configuration".dimmed());
                print!("{}", toml::to_string_pretty(&cfg.redacted())?);
            }
        },
        Commands::Export(args) => {
            let output_dir = args.output.as_ref().unwrap_or(&cfg.export.output_dir);
            commands::export::export(&cfg, output_dir, format).await?;
        }
        command => {
            let registry = open_registry(&cfg).await?;
            let result = dispatch(&registry, command, format).await;
            if let Err(e) = registry.close().await {
                tracing::debug!(error = %e, "closing connection failed");
            }
            result?;
        }
    }

    Ok(())
}

async fn open_registry(cfg: &AppConfig) -> Result<ProcessRegistry> {
    let store = CouchConnector::new(cfg.couch.clone())
        .connect(&cfg.database)
        .await
        .with_context(|| format!("Failed to open database {}", cfg.database))?;
    Ok(ProcessRegistry::new(store))
}

async fn dispatch(registry: &ProcessRegistry, command: &Commands, format: cli::OutputFormat) -> Result<()> {
    match command {
        Commands::Save(args) => commands::documents::save(registry, args, format).await,
        Commands::Get(args) => commands::documents::get(registry, &args.id, format).await,
        Commands::List(args) => commands::documents::list(registry, args.state, format).await,
        Commands::Delete(args) => {
            commands::documents::delete(registry, &args.id, &args.revision).await
        }
        Commands::Index(args) => match &args.command {
            IndexCommands::Ensure(index) => commands::indexes::ensure(registry, index, format).await,
            IndexCommands::Create(index) => commands::indexes::create(registry, index, format).await,
            IndexCommands::List => commands::indexes::list(registry, format).await,
            IndexCommands::Delete(args) => {
                commands::indexes::delete(registry, &args.design_doc, &args.name).await
            }
        },
        Commands::Export(_) | Commands::Config(_) => Ok(()),
    }
}
