use std::path::Path;

use crate::commands::common::{build_engine, normalize_user_id, open_database, resolve_message};
use crate::config::{resolve_actor_token, CliConfig};
use crate::error::CliError;

pub async fn run_read(
    user: &str,
    message_identifier: &str,
    token: Option<String>,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let user = normalize_user_id(user)?;
    let config = CliConfig::load_effective().map_err(CliError::Config)?;
    let options = config.sync_options();
    let actor_token = resolve_actor_token(token, |key| std::env::var(key).ok());

    let db = open_database(db_path).await?;
    let message = resolve_message(message_identifier, &db).await?;
    let engine = build_engine(db, &options)?;
    let outcome = engine
        .mark_read_with_sync(
            &user,
            &message.id,
            actor_token.as_deref(),
            &config.remote_config(),
            &options,
        )
        .await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if !outcome.ok {
        return Err(CliError::MessageNotFound(message_identifier.to_string()));
    }
    match (outcome.remote_synced, outcome.reason.as_deref()) {
        (true, _) => println!("Marked {} read", message.id),
        (false, Some(reason)) => {
            println!("Marked {} read locally (receipt not sent: {reason})", message.id);
        }
        (false, None) => println!("Marked {} read locally", message.id),
    }
    Ok(())
}
