use std::path::Path;

use crate::commands::common::{
    format_conversation_lines, message_to_list_item, normalize_user_id, open_database,
    parse_since, MessageListItem,
};
use crate::error::CliError;

pub async fn run_conversation(
    user: &str,
    friend: &str,
    since: Option<&str>,
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let user = normalize_user_id(user)?;
    let friend = normalize_user_id(friend)?;
    let since = since.map(parse_since).transpose()?;

    let db = open_database(db_path).await?;
    let messages = db.list_conversation(&user, &friend, since, limit).await?;

    if as_json {
        let json_items = messages
            .iter()
            .map(message_to_list_item)
            .collect::<Vec<MessageListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if messages.is_empty() {
        println!("No messages with {friend}.");
        return Ok(());
    }

    for line in format_conversation_lines(&messages, &user) {
        println!("{line}");
    }
    Ok(())
}
