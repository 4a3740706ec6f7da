use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use courier_core::models::{FriendInboxItem, Message, MessageId};
use courier_core::services::DatabaseService;
use courier_core::sync::SyncSummary;
use courier_core::util::{format_timestamp_ms, parse_timestamp_ms};
use courier_core::{HttpTransport, SyncEngine, SyncOptions};
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct MessageListItem {
    pub id: String,
    pub client_message_id: String,
    pub server_message_id: Option<String>,
    pub from: String,
    pub to: String,
    pub content_type: String,
    pub content: String,
    pub created_at: i64,
    pub created_at_iso: String,
    pub read_at: Option<i64>,
    pub sync_state: String,
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InboxListItem {
    pub friend_user_id: String,
    pub last_message_at: i64,
    pub last_message_at_iso: String,
    pub preview: String,
    pub content_type: String,
    pub unread_count: usize,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("COURIER_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("courier")
        .join("courier.db")
}

pub async fn open_database(path: &Path) -> Result<DatabaseService, CliError> {
    Ok(DatabaseService::open_path(path.to_path_buf()).await?)
}

pub fn build_engine(db: DatabaseService, options: &SyncOptions) -> Result<SyncEngine, CliError> {
    let transport = HttpTransport::new(options.request_timeout)?;
    Ok(SyncEngine::new(db, Arc::new(transport)))
}

pub fn normalize_user_id(user_id: &str) -> Result<String, CliError> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyUserId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn resolve_message_content(content_parts: &[String]) -> Result<String, CliError> {
    if let Some(content) = normalize_content(&content_parts.join(" ")) {
        return Ok(content);
    }

    if let Some(content) = read_piped_stdin()? {
        return Ok(content);
    }

    Err(CliError::EmptyContent)
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

/// Accepts RFC 3339 or Unix milliseconds.
pub fn parse_since(value: &str) -> Result<i64, CliError> {
    let trimmed = value.trim();
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| parse_timestamp_ms(trimmed))
        .ok_or_else(|| CliError::InvalidTimestamp(value.to_string()))
}

/// Find a message by local id, falling back to its client message id.
pub async fn resolve_message(
    identifier: &str,
    db: &DatabaseService,
) -> Result<Message, CliError> {
    let identifier = identifier.trim();
    if let Ok(id) = identifier.parse::<MessageId>() {
        if let Some(message) = db.get_message(&id).await? {
            return Ok(message);
        }
    }

    db.get_message_by_client_id(identifier)
        .await?
        .ok_or_else(|| CliError::MessageNotFound(identifier.to_string()))
}

pub fn message_preview(content: &str, max_chars: usize) -> String {
    let first_line = content.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn message_to_list_item(message: &Message) -> MessageListItem {
    MessageListItem {
        id: message.id.to_string(),
        client_message_id: message.client_message_id.clone(),
        server_message_id: message.server_message_id.clone(),
        from: message.sender_user_id.clone(),
        to: message.recipient_user_id.clone(),
        content_type: message.content_type.as_str().to_string(),
        content: message.content.clone(),
        created_at: message.created_at,
        created_at_iso: format_timestamp_ms(message.created_at),
        read_at: message.read_at,
        sync_state: message.sync_state.as_str().to_string(),
        last_error: message.last_error.clone(),
    }
}

pub fn inbox_to_list_item(item: &FriendInboxItem) -> InboxListItem {
    InboxListItem {
        friend_user_id: item.friend_user_id.clone(),
        last_message_at: item.last_message_at,
        last_message_at_iso: format_timestamp_ms(item.last_message_at),
        preview: message_preview(&item.last_message_content, 80),
        content_type: item.last_message_content_type.as_str().to_string(),
        unread_count: item.unread_count,
    }
}

pub fn format_conversation_lines(messages: &[Message], viewer_user_id: &str) -> Vec<String> {
    messages
        .iter()
        .map(|message| {
            let marker = if message.sender_user_id == viewer_user_id {
                format!("-> {}", message.recipient_user_id)
            } else if message.read_at.is_none() {
                format!("* {}", message.sender_user_id)
            } else {
                format!("  {}", message.sender_user_id)
            };
            let body = match message.content_type {
                courier_core::models::ContentType::Text => message_preview(&message.content, 60),
                courier_core::models::ContentType::Ciphertext => "[ciphertext]".to_string(),
            };
            let short_id = message.id.to_string().chars().take(13).collect::<String>();

            format!(
                "{short_id:<13}  {}  {marker:<14}  {body:<60}  {}",
                format_timestamp(message.created_at),
                message.sync_state.as_str()
            )
        })
        .collect()
}

pub fn format_inbox_lines(items: &[FriendInboxItem]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    items
        .iter()
        .map(|item| {
            let unread = if item.unread_count == 0 {
                String::new()
            } else {
                format!("({} unread)", item.unread_count)
            };
            format!(
                "{:<20}  {:<40}  {:<10}  {unread}",
                item.friend_user_id,
                message_preview(&item.last_message_content, 40),
                format_relative_time(item.last_message_at, now_ms)
            )
        })
        .collect()
}

pub fn format_summary_lines(summary: &SyncSummary) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(reason) = summary.reason.as_deref() {
        lines.push(format!("Sync skipped: {reason}"));
    } else if summary.ok {
        lines.push("Sync completed".to_string());
    } else {
        lines.push("Sync completed with problems".to_string());
    }

    if summary.reason.is_none() {
        lines.push(format!(
            "sent={} received={} retried={} failed={} fetch_errors={}",
            summary.sent, summary.received, summary.retried, summary.failed, summary.fetch_errors
        ));
    }
    lines.push(format!(
        "outbox: pending={} retry={} sent={} failed={}",
        summary.outbox.pending, summary.outbox.retry, summary.outbox.sent, summary.outbox.failed
    ));
    lines
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
