//! Message store: local rows, remote merges, and read projections

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::{
    ContentType, FriendInboxItem, Message, MessageId, MessageSource, RemoteMessage, SyncState,
};

const MESSAGE_COLUMNS: &str = "id, server_message_id, client_message_id, sender_user_id,
    recipient_user_id, content_type, content, source, sync_state, created_at, read_at,
    last_error, updated_at";

const CONVERSATION_FILTER: &str = "((sender_user_id = ?1 AND recipient_user_id = ?2)
    OR (sender_user_id = ?2 AND recipient_user_id = ?1))";

/// Result of merging one remote representation into the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No local row existed; a new `source = remote` row was created
    Inserted(MessageId),
    /// An existing row was brought up to date
    Updated(MessageId),
    /// The payload contradicts an existing identity binding and was ignored
    Conflict,
}

impl MergeOutcome {
    #[must_use]
    pub const fn message_id(self) -> Option<MessageId> {
        match self {
            Self::Inserted(id) | Self::Updated(id) => Some(id),
            Self::Conflict => None,
        }
    }
}

/// Trait for message storage operations
pub trait MessageRepository {
    /// Insert a locally authored message; returns `false` if its client id already exists
    fn insert_local(&self, message: &Message) -> Result<bool>;

    /// Get a message by local ID
    fn get(&self, id: &MessageId) -> Result<Option<Message>>;

    /// Get a message by its client message id
    fn get_by_client_id(&self, client_message_id: &str) -> Result<Option<Message>>;

    /// Get a message by its server message id
    fn get_by_server_id(&self, server_message_id: &str) -> Result<Option<Message>>;

    /// Idempotently merge a remote representation
    fn merge_remote(&self, remote: &RemoteMessage, now: i64) -> Result<MergeOutcome>;

    /// Mirror the outbox delivery state onto the message row
    fn set_delivery_state(
        &self,
        client_message_id: &str,
        state: SyncState,
        last_error: Option<&str>,
        now: i64,
    ) -> Result<()>;

    /// Mark a message read by its recipient; `None` if no such message for this viewer
    fn mark_read(&self, viewer_user_id: &str, id: &MessageId, now: i64)
        -> Result<Option<Message>>;

    /// Conversation between two users, oldest first
    fn list_conversation(
        &self,
        viewer_user_id: &str,
        friend_user_id: &str,
        since: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Message>>;

    /// One summary row per conversation partner, most recent conversation first
    fn list_inbox(&self, viewer_user_id: &str, limit: usize) -> Result<Vec<FriendInboxItem>>;

    /// Newest `created_at` among messages fetched from the remote for this conversation
    fn remote_watermark(&self, viewer_user_id: &str, friend_user_id: &str) -> Result<Option<i64>>;
}

/// `SQLite` implementation of `MessageRepository`
pub struct SqliteMessageRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteMessageRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn find_one(&self, column: &str, value: &str) -> Result<Option<Message>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE {column} = ?1");
        let message = self
            .conn
            .query_row(&sql, params![value], Self::parse_message)
            .optional()?;
        Ok(message)
    }

    fn refresh_from_remote(&self, id: &MessageId, remote: &RemoteMessage, now: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE messages
             SET server_message_id = ?2,
                 created_at = COALESCE(?3, created_at),
                 read_at = COALESCE(read_at, ?4),
                 sync_state = 'synced',
                 last_error = NULL,
                 updated_at = ?5
             WHERE id = ?1",
            params![
                id.as_str(),
                remote.server_message_id,
                remote.created_at,
                remote.read_at,
                now
            ],
        )?;
        Ok(())
    }

    fn insert_remote(&self, remote: &RemoteMessage, now: i64) -> Result<MessageId> {
        let id = MessageId::new();
        self.conn.execute(
            "INSERT INTO messages (
                id, server_message_id, client_message_id, sender_user_id, recipient_user_id,
                content_type, content, source, sync_state, created_at, read_at, last_error,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'remote', 'synced', ?8, ?9, NULL, ?10)",
            params![
                id.as_str(),
                remote.server_message_id,
                remote.client_message_id,
                remote.from_user_id,
                remote.to_user_id,
                remote.content_type.as_str(),
                remote.content,
                remote.created_at.unwrap_or(now),
                remote.read_at,
                now
            ],
        )?;
        Ok(id)
    }

    /// Parse a message from a database row
    fn parse_message(row: &Row<'_>) -> rusqlite::Result<Message> {
        Ok(Message {
            id: parse_column(row, 0, |raw| raw.parse().ok())?,
            server_message_id: row.get(1)?,
            client_message_id: row.get(2)?,
            sender_user_id: row.get(3)?,
            recipient_user_id: row.get(4)?,
            content_type: parse_column(row, 5, ContentType::parse)?,
            content: row.get(6)?,
            source: parse_column(row, 7, MessageSource::parse)?,
            sync_state: parse_column(row, 8, SyncState::parse)?,
            created_at: row.get(9)?,
            read_at: row.get(10)?,
            last_error: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }
}

/// Read a text column and convert it, reporting unknown values as conversion failures
pub(crate) fn parse_column<T>(
    row: &Row<'_>,
    index: usize,
    parse: impl FnOnce(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(index)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            format!("unexpected column value: {raw}").into(),
        )
    })
}

pub(crate) fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl MessageRepository for SqliteMessageRepository<'_> {
    fn insert_local(&self, message: &Message) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO messages (
                id, server_message_id, client_message_id, sender_user_id, recipient_user_id,
                content_type, content, source, sync_state, created_at, read_at, last_error,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                message.id.as_str(),
                message.server_message_id,
                message.client_message_id,
                message.sender_user_id,
                message.recipient_user_id,
                message.content_type.as_str(),
                message.content,
                message.source.as_str(),
                message.sync_state.as_str(),
                message.created_at,
                message.read_at,
                message.last_error,
                message.updated_at
            ],
        )?;
        Ok(inserted > 0)
    }

    fn get(&self, id: &MessageId) -> Result<Option<Message>> {
        self.find_one("id", &id.as_str())
    }

    fn get_by_client_id(&self, client_message_id: &str) -> Result<Option<Message>> {
        self.find_one("client_message_id", client_message_id)
    }

    fn get_by_server_id(&self, server_message_id: &str) -> Result<Option<Message>> {
        self.find_one("server_message_id", server_message_id)
    }

    fn merge_remote(&self, remote: &RemoteMessage, now: i64) -> Result<MergeOutcome> {
        let by_client = self.get_by_client_id(&remote.client_message_id)?;
        let by_server = self.get_by_server_id(&remote.server_message_id)?;

        if let Some(existing) = by_client.as_ref() {
            if existing.sender_user_id != remote.from_user_id
                || existing.recipient_user_id != remote.to_user_id
            {
                tracing::warn!(
                    client_message_id = %remote.client_message_id,
                    incoming_server_id = %remote.server_message_id,
                    "Ignoring remote message: participants differ from the stored row"
                );
                return Ok(MergeOutcome::Conflict);
            }
        }

        match (by_client, by_server) {
            (Some(existing), Some(bound)) if existing.id == bound.id => {
                self.refresh_from_remote(&existing.id, remote, now)?;
                Ok(MergeOutcome::Updated(existing.id))
            }
            (Some(existing), None) => {
                if let Some(current) = existing.server_message_id.as_deref() {
                    tracing::warn!(
                        client_message_id = %remote.client_message_id,
                        stored_server_id = current,
                        incoming_server_id = %remote.server_message_id,
                        "Ignoring remote message: client id already bound to another server id"
                    );
                    return Ok(MergeOutcome::Conflict);
                }
                self.refresh_from_remote(&existing.id, remote, now)?;
                Ok(MergeOutcome::Updated(existing.id))
            }
            (_, Some(bound)) => {
                tracing::warn!(
                    server_message_id = %remote.server_message_id,
                    stored_client_id = %bound.client_message_id,
                    incoming_client_id = %remote.client_message_id,
                    "Ignoring remote message: server id already bound to another client id"
                );
                Ok(MergeOutcome::Conflict)
            }
            (None, None) => Ok(MergeOutcome::Inserted(self.insert_remote(remote, now)?)),
        }
    }

    fn set_delivery_state(
        &self,
        client_message_id: &str,
        state: SyncState,
        last_error: Option<&str>,
        now: i64,
    ) -> Result<()> {
        // A row already confirmed by the remote never regresses.
        self.conn.execute(
            "UPDATE messages
             SET sync_state = ?2, last_error = ?3, updated_at = ?4
             WHERE client_message_id = ?1 AND sync_state <> 'synced'",
            params![client_message_id, state.as_str(), last_error, now],
        )?;
        Ok(())
    }

    fn mark_read(
        &self,
        viewer_user_id: &str,
        id: &MessageId,
        now: i64,
    ) -> Result<Option<Message>> {
        let rows = self.conn.execute(
            "UPDATE messages
             SET read_at = COALESCE(read_at, ?3), updated_at = ?3
             WHERE id = ?1 AND recipient_user_id = ?2",
            params![id.as_str(), viewer_user_id, now],
        )?;

        if rows == 0 {
            return Ok(None);
        }
        self.get(id)
    }

    fn list_conversation(
        &self,
        viewer_user_id: &str,
        friend_user_id: &str,
        since: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let sql = format!(
            "SELECT * FROM (
                SELECT {MESSAGE_COLUMNS} FROM messages
                WHERE {CONVERSATION_FILTER} AND (?3 IS NULL OR created_at > ?3)
                ORDER BY created_at DESC, id DESC
                LIMIT ?4
             )
             ORDER BY created_at ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let messages = stmt
            .query_map(
                params![viewer_user_id, friend_user_id, since, sql_limit(limit)],
                Self::parse_message,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(messages)
    }

    fn list_inbox(&self, viewer_user_id: &str, limit: usize) -> Result<Vec<FriendInboxItem>> {
        let mut stmt = self.conn.prepare(
            "WITH conversation AS (
                SELECT
                    CASE WHEN sender_user_id = ?1 THEN recipient_user_id
                         ELSE sender_user_id END AS friend_user_id,
                    id, content, content_type, created_at,
                    CASE WHEN recipient_user_id = ?1 AND read_at IS NULL THEN 1
                         ELSE 0 END AS unread
                FROM messages
                WHERE sender_user_id = ?1 OR recipient_user_id = ?1
             ),
             ranked AS (
                SELECT friend_user_id, content, content_type, created_at,
                    ROW_NUMBER() OVER (
                        PARTITION BY friend_user_id ORDER BY created_at DESC, id DESC
                    ) AS recency,
                    SUM(unread) OVER (PARTITION BY friend_user_id) AS unread_count
                FROM conversation
             )
             SELECT friend_user_id, created_at, content, content_type, unread_count
             FROM ranked
             WHERE recency = 1
             ORDER BY created_at DESC, friend_user_id ASC
             LIMIT ?2",
        )?;

        let items = stmt
            .query_map(params![viewer_user_id, sql_limit(limit)], |row| {
                Ok(FriendInboxItem {
                    friend_user_id: row.get(0)?,
                    last_message_at: row.get(1)?,
                    last_message_content: row.get(2)?,
                    last_message_content_type: parse_column(row, 3, ContentType::parse)?,
                    unread_count: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }

    fn remote_watermark(&self, viewer_user_id: &str, friend_user_id: &str) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT MAX(created_at) FROM messages
             WHERE (source = 'remote' OR server_message_id IS NOT NULL)
               AND {CONVERSATION_FILTER}"
        );
        let watermark = self
            .conn
            .query_row(&sql, params![viewer_user_id, friend_user_id], |row| {
                row.get(0)
            })?;
        Ok(watermark)
    }
}
