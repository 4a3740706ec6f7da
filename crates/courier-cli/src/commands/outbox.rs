use std::path::Path;

use crate::commands::common::{normalize_user_id, open_database};
use crate::error::CliError;

pub async fn run_outbox(user: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let user = normalize_user_id(user)?;
    let db = open_database(db_path).await?;
    let counts = db.count_outbox_by_status(&user).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&counts)?);
    } else {
        println!(
            "pending={} retry={} sent={} failed={}",
            counts.pending, counts.retry, counts.sent, counts.failed
        );
    }
    Ok(())
}
