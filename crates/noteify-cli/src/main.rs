//! Noteify CLI - manage notes stored behind the Noteify API from the terminal.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands {
    pub mod add;
    pub mod common;
    pub mod completions;
    pub mod delete;
    pub mod edit;
    pub mod list;
    pub mod summarize;
    pub mod tags;
}
mod error;


use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::common::CommandContext;
use crate::commands::completions::run_completions;
use crate::commands::delete::run_delete;
use crate::commands::edit::{run_edit, NoteEdits};
use crate::commands::list::run_list;
use crate::commands::summarize::run_summarize;
use crate::commands::tags::run_tags;
use crate::error::CliError;

const DEFAULT_LOG_DIRECTIVE: &str = "noteify=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let context = CommandContext::new(cli.api_url, cli.token)?;
    match cli.command {
        Commands::List {
            search,
            tags,
            limit,
            json,
        } => run_list(&context, search.as_deref(), &tags, limit, json).await?,
        Commands::Tags { json } => run_tags(&context, json).await?,
        Commands::Add {
            title,
            tags,
            content,
        } => run_add(&context, title.as_deref(), &tags, &content).await?,
        Commands::Edit {
            id,
            title,
            content,
            tags,
        } => {
            let edits = NoteEdits {
                title,
                content,
                tags,
            };
            run_edit(&context, &id, edits).await?;
        }
        Commands::Delete { id } => run_delete(&context, &id).await?,
        Commands::Summarize { id } => run_summarize(&context, &id).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
