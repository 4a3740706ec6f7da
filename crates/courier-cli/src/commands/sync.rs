use std::path::Path;

use crate::commands::common::{build_engine, format_summary_lines, normalize_user_id, open_database};
use crate::config::{resolve_actor_token, CliConfig};
use crate::error::CliError;

pub async fn run_sync(
    user: &str,
    token: Option<String>,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let user = normalize_user_id(user)?;
    let config = CliConfig::load_effective().map_err(CliError::Config)?;
    let options = config.sync_options();
    let actor_token = resolve_actor_token(token, |key| std::env::var(key).ok());

    let engine = build_engine(open_database(db_path).await?, &options)?;
    let summary = engine
        .run_cycle(&user, actor_token.as_deref(), &config.remote_config(), &options)
        .await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    for line in format_summary_lines(&summary) {
        println!("{line}");
    }
    Ok(())
}
