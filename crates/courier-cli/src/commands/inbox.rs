use std::path::Path;

use crate::commands::common::{
    format_inbox_lines, inbox_to_list_item, normalize_user_id, open_database, InboxListItem,
};
use crate::error::CliError;

pub async fn run_inbox(
    user: &str,
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let user = normalize_user_id(user)?;
    let db = open_database(db_path).await?;
    let items = db.list_inbox(&user, limit).await?;

    if as_json {
        let json_items = items
            .iter()
            .map(inbox_to_list_item)
            .collect::<Vec<InboxListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No conversations yet.");
        return Ok(());
    }

    for line in format_inbox_lines(&items) {
        println!("{line}");
    }
    Ok(())
}
