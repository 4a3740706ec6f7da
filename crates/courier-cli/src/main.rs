//! Courier CLI - Command-line interface for offline-first direct messages
//!
//! Messages are queued locally and delivered by explicit `courier sync` runs.

mod cli;
mod commands;
mod config;
mod error;

use clap::Parser;
use tracing_subscriber::filter::Directive;

use crate::cli::{Cli, Commands};
use crate::commands::common::resolve_db_path;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::conversation::run_conversation;
use crate::commands::friend::run_friend;
use crate::commands::inbox::run_inbox;
use crate::commands::outbox::run_outbox;
use crate::commands::read::run_read;
use crate::commands::send::run_send;
use crate::commands::sync::run_sync;
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

    let default_directive = "courier=info"
        .parse::<Directive>()
        .map_err(|error| CliError::Config(error.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_directive),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Send {
            from,
            to,
            ciphertext,
            client_id,
            content,
        } => run_send(&from, &to, ciphertext, client_id, &content, &db_path).await?,
        Commands::Sync { user, token, json } => run_sync(&user, token, json, &db_path).await?,
        Commands::Inbox { user, limit, json } => run_inbox(&user, limit, json, &db_path).await?,
        Commands::Conversation {
            user,
            friend,
            since,
            limit,
            json,
        } => {
            run_conversation(&user, &friend, since.as_deref(), limit, json, &db_path).await?;
        }
        Commands::Read {
            user,
            message_id,
            token,
            json,
        } => run_read(&user, &message_id, token, json, &db_path).await?,
        Commands::Outbox { user, json } => run_outbox(&user, json, &db_path).await?,
        Commands::Friend { command } => run_friend(command, &db_path).await?,
        Commands::Config { command } => run_config(command)?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
