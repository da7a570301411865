//! Depot CLI - drive the warehouse mirror sync from a terminal
//!
//! Runs full syncs, feeds push payloads and works the retry queue the same way
//! the app shell does.

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::resolve_db_path;
use crate::commands::failed::run_failed;
use crate::commands::notify::run_notify;
use crate::commands::retry::run_retry;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::commands::tables::run_tables;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Sync { user_type, user_id } => run_sync(user_type, user_id, &db_path).await?,
        Commands::Notify { path } => run_notify(path.as_deref(), &db_path).await?,
        Commands::Retry => run_retry(&db_path).await?,
        Commands::Failed { json } => run_failed(json, &db_path).await?,
        Commands::Status { json } => run_status(json, &db_path).await?,
        Commands::Tables { user_type, json } => run_tables(user_type, json)?,
    }

    Ok(())
}

fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    for directive in ["depot=info", "depot_core=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
