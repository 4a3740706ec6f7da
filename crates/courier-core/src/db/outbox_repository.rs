//! Outbox queue repository

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::message_repository::{parse_column, sql_limit};
use crate::error::Result;
use crate::models::{ContentType, OutboxCounts, OutboxItem, OutboxStatus};

const OUTBOX_COLUMNS: &str = "client_message_id, from_user_id, to_user_id, content,
    content_type, created_at, status, attempts, next_retry_at, last_error, updated_at";

/// Outcome of one delivery attempt, as recorded on the outbox item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryRecord<'a> {
    Sent,
    Retry { next_retry_at: i64, error: &'a str },
    Failed { error: &'a str },
}

impl DeliveryRecord<'_> {
    const fn status(&self) -> OutboxStatus {
        match self {
            Self::Sent => OutboxStatus::Sent,
            Self::Retry { .. } => OutboxStatus::Retry,
            Self::Failed { .. } => OutboxStatus::Failed,
        }
    }
}

/// Trait for outbox storage operations
pub trait OutboxRepository {
    /// Insert a new item; returns `false` if the client id is already queued
    fn insert(&self, item: &OutboxItem) -> Result<bool>;

    /// Get an item by client message id
    fn get(&self, client_message_id: &str) -> Result<Option<OutboxItem>>;

    /// Items of `user_id` that are due for delivery at `now`, oldest first
    fn list_due(&self, user_id: &str, now: i64, limit: usize) -> Result<Vec<OutboxItem>>;

    /// Record a delivery attempt; terminal items are left untouched
    fn record_attempt(
        &self,
        client_message_id: &str,
        record: &DeliveryRecord<'_>,
        now: i64,
    ) -> Result<()>;

    /// Count items per status for a sender
    fn count_by_status(&self, user_id: &str) -> Result<OutboxCounts>;
}

/// `SQLite` implementation of `OutboxRepository`
pub struct SqliteOutboxRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteOutboxRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse an outbox item from a database row
    fn parse_item(row: &Row<'_>) -> rusqlite::Result<OutboxItem> {
        Ok(OutboxItem {
            client_message_id: row.get(0)?,
            from_user_id: row.get(1)?,
            to_user_id: row.get(2)?,
            content: row.get(3)?,
            content_type: parse_column(row, 4, ContentType::parse)?,
            created_at: row.get(5)?,
            status: parse_column(row, 6, OutboxStatus::parse)?,
            attempts: row.get(7)?,
            next_retry_at: row.get(8)?,
            last_error: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

impl OutboxRepository for SqliteOutboxRepository<'_> {
    fn insert(&self, item: &OutboxItem) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO outbox_items (
                client_message_id, from_user_id, to_user_id, content, content_type,
                created_at, status, attempts, next_retry_at, last_error, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                item.client_message_id,
                item.from_user_id,
                item.to_user_id,
                item.content,
                item.content_type.as_str(),
                item.created_at,
                item.status.as_str(),
                item.attempts,
                item.next_retry_at,
                item.last_error,
                item.updated_at
            ],
        )?;
        Ok(inserted > 0)
    }

    fn get(&self, client_message_id: &str) -> Result<Option<OutboxItem>> {
        let sql = format!("SELECT {OUTBOX_COLUMNS} FROM outbox_items WHERE client_message_id = ?1");
        let item = self
            .conn
            .query_row(&sql, params![client_message_id], Self::parse_item)
            .optional()?;
        Ok(item)
    }

    fn list_due(&self, user_id: &str, now: i64, limit: usize) -> Result<Vec<OutboxItem>> {
        let sql = format!(
            "SELECT {OUTBOX_COLUMNS} FROM outbox_items
             WHERE from_user_id = ?1
               AND status IN ('pending', 'retry')
               AND (next_retry_at IS NULL OR next_retry_at <= ?2)
             ORDER BY created_at ASC, client_message_id ASC
             LIMIT ?3"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![user_id, now, sql_limit(limit)], Self::parse_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }

    fn record_attempt(
        &self,
        client_message_id: &str,
        record: &DeliveryRecord<'_>,
        now: i64,
    ) -> Result<()> {
        let (next_retry_at, last_error) = match record {
            DeliveryRecord::Sent => (None, None),
            DeliveryRecord::Retry {
                next_retry_at,
                error,
            } => (Some(*next_retry_at), Some(*error)),
            DeliveryRecord::Failed { error } => (None, Some(*error)),
        };

        self.conn.execute(
            "UPDATE outbox_items
             SET status = ?2,
                 attempts = attempts + 1,
                 next_retry_at = ?3,
                 last_error = ?4,
                 updated_at = ?5
             WHERE client_message_id = ?1 AND status IN ('pending', 'retry')",
            params![
                client_message_id,
                record.status().as_str(),
                next_retry_at,
                last_error,
                now
            ],
        )?;
        Ok(())
    }

    fn count_by_status(&self, user_id: &str) -> Result<OutboxCounts> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) FROM outbox_items
             WHERE from_user_id = ?1
             GROUP BY status",
        )?;

        let mut counts = OutboxCounts::default();
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                parse_column(row, 0, OutboxStatus::parse)?,
                row.get::<_, usize>(1)?,
            ))
        })?;
        for row in rows {
            let (status, count) = row?;
            counts.add(status, count);
        }

        Ok(counts)
    }
}
