use std::path::Path;

use courier_core::models::ContentType;
use courier_core::NewOutboxMessage;

use crate::commands::common::{normalize_user_id, open_database, resolve_message_content};
use crate::error::CliError;

pub async fn run_send(
    from: &str,
    to: &str,
    ciphertext: bool,
    client_id: Option<String>,
    content_parts: &[String],
    db_path: &Path,
) -> Result<(), CliError> {
    let input = NewOutboxMessage {
        from_user_id: normalize_user_id(from)?,
        to_user_id: normalize_user_id(to)?,
        content: resolve_message_content(content_parts)?,
        content_type: Some(if ciphertext {
            ContentType::Ciphertext
        } else {
            ContentType::Text
        }),
        client_message_id: client_id,
        created_at: None,
    };

    let db = open_database(db_path).await?;
    let item = db.enqueue_message(input).await?;
    println!("Queued {} ({})", item.client_message_id, item.status.as_str());
    Ok(())
}
