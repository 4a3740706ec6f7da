//! Shared database service wrapper used by the sync engine and clients.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    Database, DeliveryRecord, FriendRepository, MergeOutcome, MessageRepository, OutboxRepository,
    SqliteFriendRepository, SqliteMessageRepository, SqliteOutboxRepository, ACCEPTED,
};
use crate::models::{
    new_client_message_id, FriendInboxItem, Message, MessageId, MessageSource, NewOutboxMessage,
    OutboxCounts, OutboxItem, OutboxStatus, RemoteMessage, SyncState,
};
use crate::util::{normalize_text_option, now_ms, parse_timestamp_ms};
use crate::{Error, Result};

/// Thread-safe service for DB and repository operations.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        tracing::debug!("Opened message store at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Location of the backing file, if any.
    #[must_use]
    pub fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    /// Queue a message for delivery and materialize its local row.
    ///
    /// Both rows are written in one transaction. Queueing a client id that is
    /// already known returns the stored item unchanged.
    pub async fn enqueue_message(&self, input: NewOutboxMessage) -> Result<OutboxItem> {
        let from_user_id = required(input.from_user_id, "sender user id")?;
        let to_user_id = required(input.to_user_id, "recipient user id")?;
        if input.content.trim().is_empty() {
            return Err(Error::InvalidInput(
                "message content cannot be empty".to_string(),
            ));
        }

        let now = now_ms();
        let client_message_id =
            normalize_text_option(input.client_message_id).unwrap_or_else(new_client_message_id);
        let created_at = input
            .created_at
            .as_deref()
            .and_then(parse_timestamp_ms)
            .unwrap_or(now);

        let item = OutboxItem {
            client_message_id,
            from_user_id,
            to_user_id,
            content: input.content,
            content_type: input.content_type.unwrap_or_default(),
            created_at,
            status: OutboxStatus::Pending,
            attempts: 0,
            next_retry_at: None,
            last_error: None,
            updated_at: now,
        };

        let db = self.db.lock().await;
        let tx = db.connection().unchecked_transaction()?;
        let outbox = SqliteOutboxRepository::new(&tx);

        if let Some(existing) = outbox.get(&item.client_message_id)? {
            tracing::debug!(
                client_message_id = %existing.client_message_id,
                "Message already queued"
            );
            return Ok(existing);
        }

        outbox.insert(&item)?;
        SqliteMessageRepository::new(&tx).insert_local(&Message {
            id: MessageId::new(),
            server_message_id: None,
            client_message_id: item.client_message_id.clone(),
            sender_user_id: item.from_user_id.clone(),
            recipient_user_id: item.to_user_id.clone(),
            content_type: item.content_type,
            content: item.content.clone(),
            source: MessageSource::Local,
            sync_state: SyncState::Pending,
            created_at: item.created_at,
            read_at: None,
            last_error: None,
            updated_at: now,
        })?;
        tx.commit()?;

        Ok(item)
    }

    /// Fetch an outbox item by client message id.
    pub async fn get_outbox_item(&self, client_message_id: &str) -> Result<Option<OutboxItem>> {
        let db = self.db.lock().await;
        SqliteOutboxRepository::new(db.connection()).get(client_message_id)
    }

    /// Outbox items of `user_id` due at `now`, oldest first.
    pub async fn due_outbox(&self, user_id: &str, now: i64, limit: usize) -> Result<Vec<OutboxItem>> {
        let db = self.db.lock().await;
        SqliteOutboxRepository::new(db.connection()).list_due(user_id, now, limit)
    }

    /// Count outbox items per status.
    pub async fn count_outbox_by_status(&self, user_id: &str) -> Result<OutboxCounts> {
        let db = self.db.lock().await;
        SqliteOutboxRepository::new(db.connection()).count_by_status(user_id)
    }

    /// Record a delivery attempt on the outbox item and mirror it on the message row.
    ///
    /// On success the server's representation, when present, is merged in the
    /// same transaction.
    pub async fn record_delivery(
        &self,
        client_message_id: &str,
        record: &DeliveryRecord<'_>,
        confirmed: Option<&RemoteMessage>,
        now: i64,
    ) -> Result<Option<MergeOutcome>> {
        let db = self.db.lock().await;
        let tx = db.connection().unchecked_transaction()?;
        SqliteOutboxRepository::new(&tx).record_attempt(client_message_id, record, now)?;

        let messages = SqliteMessageRepository::new(&tx);
        let merged = match confirmed {
            Some(remote) => Some(messages.merge_remote(remote, now)?),
            None => None,
        };
        let (state, error) = match record {
            DeliveryRecord::Sent => (SyncState::Synced, None),
            DeliveryRecord::Retry { error, .. } => (SyncState::Retry, Some(*error)),
            DeliveryRecord::Failed { error } => (SyncState::Failed, Some(*error)),
        };
        messages.set_delivery_state(client_message_id, state, error, now)?;
        tx.commit()?;

        Ok(merged)
    }

    /// Merge a batch of remote representations in one transaction.
    pub async fn merge_remote_messages(
        &self,
        items: &[RemoteMessage],
        now: i64,
    ) -> Result<Vec<MergeOutcome>> {
        let db = self.db.lock().await;
        let tx = db.connection().unchecked_transaction()?;
        let messages = SqliteMessageRepository::new(&tx);
        let outcomes = items
            .iter()
            .map(|item| messages.merge_remote(item, now))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;
        Ok(outcomes)
    }

    /// Newest remote-observed `created_at` in a conversation.
    pub async fn remote_watermark(
        &self,
        viewer_user_id: &str,
        friend_user_id: &str,
    ) -> Result<Option<i64>> {
        let db = self.db.lock().await;
        SqliteMessageRepository::new(db.connection()).remote_watermark(viewer_user_id, friend_user_id)
    }

    /// Mark a message read by its recipient.
    pub async fn mark_message_read(
        &self,
        viewer_user_id: &str,
        id: &MessageId,
        now: i64,
    ) -> Result<Option<Message>> {
        let db = self.db.lock().await;
        SqliteMessageRepository::new(db.connection()).mark_read(viewer_user_id, id, now)
    }

    /// Fetch a message by local id.
    pub async fn get_message(&self, id: &MessageId) -> Result<Option<Message>> {
        let db = self.db.lock().await;
        SqliteMessageRepository::new(db.connection()).get(id)
    }

    /// Fetch a message by client message id.
    pub async fn get_message_by_client_id(&self, client_message_id: &str) -> Result<Option<Message>> {
        let db = self.db.lock().await;
        SqliteMessageRepository::new(db.connection()).get_by_client_id(client_message_id)
    }

    /// Conversation between `viewer_user_id` and `friend_user_id`, oldest first.
    pub async fn list_conversation(
        &self,
        viewer_user_id: &str,
        friend_user_id: &str,
        since: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let db = self.db.lock().await;
        SqliteMessageRepository::new(db.connection()).list_conversation(
            viewer_user_id,
            friend_user_id,
            since,
            limit,
        )
    }

    /// One row per conversation partner, newest conversation first.
    pub async fn list_inbox(&self, viewer_user_id: &str, limit: usize) -> Result<Vec<FriendInboxItem>> {
        let db = self.db.lock().await;
        SqliteMessageRepository::new(db.connection()).list_inbox(viewer_user_id, limit)
    }

    /// Record an accepted friendship.
    pub async fn add_friend(&self, user_id: &str, friend_user_id: &str) -> Result<()> {
        let user_id = required(user_id.to_string(), "user id")?;
        let friend_user_id = required(friend_user_id.to_string(), "friend user id")?;
        if user_id == friend_user_id {
            return Err(Error::InvalidInput(
                "a user cannot befriend themselves".to_string(),
            ));
        }

        let db = self.db.lock().await;
        SqliteFriendRepository::new(db.connection()).upsert(
            &user_id,
            &friend_user_id,
            ACCEPTED,
            now_ms(),
        )
    }

    /// Accepted friends of `user_id`.
    pub async fn list_friends(&self, user_id: &str, limit: usize) -> Result<Vec<String>> {
        let db = self.db.lock().await;
        SqliteFriendRepository::new(db.connection()).list_accepted(user_id, limit)
    }
}

fn required(value: String, field: &str) -> Result<String> {
    normalize_text_option(Some(value))
        .ok_or_else(|| Error::InvalidInput(format!("{field} cannot be empty")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;
    use pretty_assertions::assert_eq;

    fn remote(server_id: &str, client_id: &str) -> RemoteMessage {
        RemoteMessage {
            server_message_id: server_id.to_string(),
            client_message_id: client_id.to_string(),
            from_user_id: "alice".to_string(),
            to_user_id: "bob".to_string(),
            content_type: ContentType::Text,
            content: "hello".to_string(),
            created_at: Some(1_700_000_000_000),
            read_at: None,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn enqueue_creates_outbox_item_and_local_message() {
        let service = DatabaseService::open_in_memory().await.unwrap();

        let item = service
            .enqueue_message(NewOutboxMessage::text("alice", "bob", "hello"))
            .await
            .unwrap();
        assert_eq!(item.status, OutboxStatus::Pending);
        assert_eq!(item.attempts, 0);
        assert!(item.client_message_id.parse::<uuid::Uuid>().is_ok());

        let message = service
            .get_message_by_client_id(&item.client_message_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.source, MessageSource::Local);
        assert_eq!(message.sync_state, SyncState::Pending);
        assert_eq!(message.created_at, item.created_at);
        assert_eq!(message.server_message_id, None);

        let counts = service.count_outbox_by_status("alice").await.unwrap();
        assert_eq!(counts.pending, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn enqueue_is_idempotent_per_client_id() {
        let service = DatabaseService::open_in_memory().await.unwrap();

        let first = service
            .enqueue_message(NewOutboxMessage::text("alice", "bob", "one").with_client_message_id("c1"))
            .await
            .unwrap();
        let second = service
            .enqueue_message(NewOutboxMessage::text("alice", "bob", "two").with_client_message_id("c1"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(second.content, "one");
        assert_eq!(service.count_outbox_by_status("alice").await.unwrap().pending, 1);
        assert_eq!(service.list_conversation("alice", "bob", None, 10).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn enqueue_parses_or_replaces_created_at() {
        let service = DatabaseService::open_in_memory().await.unwrap();

        let mut explicit = NewOutboxMessage::text("alice", "bob", "dated");
        explicit.created_at = Some("2024-01-01T00:00:00Z".to_string());
        let item = service.enqueue_message(explicit).await.unwrap();
        assert_eq!(item.created_at, 1_704_067_200_000);

        let before = now_ms();
        let mut malformed = NewOutboxMessage::text("alice", "bob", "undated");
        malformed.created_at = Some("yesterday-ish".to_string());
        let item = service.enqueue_message(malformed).await.unwrap();
        assert!(item.created_at >= before);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn enqueue_rejects_blank_fields() {
        let service = DatabaseService::open_in_memory().await.unwrap();

        for input in [
            NewOutboxMessage::text(" ", "bob", "hi"),
            NewOutboxMessage::text("alice", "", "hi"),
            NewOutboxMessage::text("alice", "bob", "   "),
        ] {
            let result = service.enqueue_message(input).await;
            assert!(matches!(result, Err(Error::InvalidInput(_))));
        }
        assert_eq!(
            service.count_outbox_by_status("alice").await.unwrap(),
            OutboxCounts::default()
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sent_delivery_merges_confirmation_and_marks_synced() {
        let service = DatabaseService::open_in_memory().await.unwrap();
        service
            .enqueue_message(NewOutboxMessage::text("alice", "bob", "hello").with_client_message_id("c1"))
            .await
            .unwrap();

        let merged = service
            .record_delivery("c1", &DeliveryRecord::Sent, Some(&remote("s1", "c1")), now_ms())
            .await
            .unwrap();
        assert!(matches!(merged, Some(MergeOutcome::Updated(_))));

        let item = service.get_outbox_item("c1").await.unwrap().unwrap();
        assert_eq!(item.status, OutboxStatus::Sent);
        assert_eq!(item.attempts, 1);

        let message = service.get_message_by_client_id("c1").await.unwrap().unwrap();
        assert_eq!(message.server_message_id.as_deref(), Some("s1"));
        assert_eq!(message.sync_state, SyncState::Synced);
        assert_eq!(message.source, MessageSource::Local);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn retry_delivery_mirrors_error_on_message() {
        let service = DatabaseService::open_in_memory().await.unwrap();
        service
            .enqueue_message(NewOutboxMessage::text("alice", "bob", "hello").with_client_message_id("c1"))
            .await
            .unwrap();

        let record = DeliveryRecord::Retry {
            next_retry_at: 99_000,
            error: "HTTP 503",
        };
        service.record_delivery("c1", &record, None, 84_000).await.unwrap();

        let item = service.get_outbox_item("c1").await.unwrap().unwrap();
        assert_eq!(item.status, OutboxStatus::Retry);
        assert_eq!(item.next_retry_at, Some(99_000));
        let message = service.get_message_by_client_id("c1").await.unwrap().unwrap();
        assert_eq!(message.sync_state, SyncState::Retry);
        assert_eq!(message.last_error.as_deref(), Some("HTTP 503"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn friends_are_directional_and_validated() {
        let service = DatabaseService::open_in_memory().await.unwrap();
        service.add_friend("alice", "bob").await.unwrap();
        service.add_friend("alice", "bob").await.unwrap();

        assert_eq!(service.list_friends("alice", 10).await.unwrap(), vec!["bob"]);
        assert!(service.list_friends("bob", 10).await.unwrap().is_empty());
        assert!(matches!(
            service.add_friend("alice", "alice").await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn open_path_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("courier.db");

        let service = DatabaseService::open_path(&path).await.unwrap();
        service
            .enqueue_message(NewOutboxMessage::text("alice", "bob", "persisted"))
            .await
            .unwrap();
        drop(service);

        let reopened = DatabaseService::open_path(&path).await.unwrap();
        assert_eq!(reopened.db_path(), Some(&path));
        assert_eq!(reopened.count_outbox_by_status("alice").await.unwrap().pending, 1);
    }
}
