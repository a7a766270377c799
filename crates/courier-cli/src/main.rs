//! Courier CLI - capture records from the command line
//!
//! Records are stored locally first and delivered to the remote service by
//! `courier sync`; capture never needs connectivity.

mod cli;
mod commands;
mod error;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::add::{run_add, run_quick_add};
use crate::commands::completions::run_completions;
use crate::commands::list::run_list;
use crate::commands::show::run_show;
use crate::commands::stats::run_stats;
use crate::commands::sync::{run_retry, run_sync};
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

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("courier_core=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let db_path = commands::common::resolve_db_path(cli.db_path);
    let remote = cli.remote;

    match cli.command {
        Some(Commands::Add { title, body }) => run_add(&title, &body, &db_path).await?,
        Some(Commands::List {
            limit,
            status,
            json,
        }) => run_list(limit, status, json, &db_path).await?,
        Some(Commands::Show { id }) => run_show(&id, &db_path).await?,
        Some(Commands::Sync) => run_sync(&db_path, remote.as_deref()).await?,
        Some(Commands::Retry) => run_retry(&db_path, remote.as_deref()).await?,
        Some(Commands::Stats { json }) => run_stats(json, &db_path).await?,
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        None => {
            // Quick capture mode: courier "my record"
            if cli.record.is_empty() {
                Cli::command().print_help().map_err(CliError::Io)?;
                println!();
            } else {
                run_quick_add(&cli.record, &db_path).await?;
            }
        }
    }

    Ok(())
}
