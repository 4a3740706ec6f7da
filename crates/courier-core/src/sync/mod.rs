//! Sync engine: outbox delivery, remote pull, and read receipts.
//!
//! A cycle runs in four steps:
//!
//! 1. resolve the remote base URL (offline short-circuits without mutation)
//! 2. deliver due outbox items one at a time, oldest first
//! 3. pull every accepted friend's conversation since its watermark
//! 4. recount the outbox and summarize
//!
//! Remote failures are folded into the returned [`SyncSummary`]; only local
//! store failures surface as `Err`.

mod backoff;
mod single_flight;
#[cfg(test)]
mod tests;

pub use backoff::{next_retry_at, retry_delay, BASE_RETRY_DELAY, MAX_RETRY_DELAY};
pub use single_flight::{UserLockGuard, UserLocks};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{RemoteConfig, SyncOptions};
use crate::db::{DeliveryRecord, MergeOutcome};
use crate::models::{Message, MessageId, OutboxCounts, OutboxItem, RemoteMessage};
use crate::services::DatabaseService;
use crate::transport::{
    ConversationQuery, ReadReceiptRequest, RemoteTransport, SendMessageRequest, TransportError,
    TransportResult,
};
use crate::util::{format_timestamp_ms, now_ms};
use crate::Result;

/// Reason reported when a read receipt cannot be sent for a local-only message
pub const MISSING_SERVER_MESSAGE_ID: &str = "missing_server_message_id";

/// Reason reported when the message does not exist for the viewer
pub const MESSAGE_NOT_FOUND: &str = "message_not_found";

/// Source of the friends whose conversations are pulled
#[async_trait]
pub trait FriendDirectory: Send + Sync {
    /// Accepted friends of `user_id`, at most `limit`.
    async fn accepted_friends(&self, user_id: &str, limit: usize) -> Result<Vec<String>>;
}

#[async_trait]
impl FriendDirectory for DatabaseService {
    async fn accepted_friends(&self, user_id: &str, limit: usize) -> Result<Vec<String>> {
        self.list_friends(user_id, limit).await
    }
}

/// Aggregated result of one sync cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// No failure, retry, or fetch error occurred and the remote was reachable
    pub ok: bool,
    /// Why the cycle did not reach the remote
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub sent: usize,
    pub received: usize,
    pub failed: usize,
    pub retried: usize,
    pub fetch_errors: usize,
    /// Outbox counts after the cycle
    pub outbox: OutboxCounts,
}

/// Result of marking a message read and reporting it upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadSyncOutcome {
    /// The local mark succeeded
    pub ok: bool,
    pub message: Option<Message>,
    /// The server acknowledged the read receipt
    pub remote_synced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ReadSyncOutcome {
    fn local_only(message: Message, reason: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: Some(message),
            remote_synced: false,
            reason: Some(reason.into()),
        }
    }
}

/// Drives sync cycles for any number of users over one store.
#[derive(Clone)]
pub struct SyncEngine {
    db: DatabaseService,
    transport: Arc<dyn RemoteTransport>,
    friends: Arc<dyn FriendDirectory>,
    locks: UserLocks,
}

impl SyncEngine {
    /// Engine whose friend list comes from the local store.
    pub fn new(db: DatabaseService, transport: Arc<dyn RemoteTransport>) -> Self {
        let friends: Arc<dyn FriendDirectory> = Arc::new(db.clone());
        Self {
            db,
            transport,
            friends,
            locks: UserLocks::new(),
        }
    }

    /// Replace the friend directory.
    #[must_use]
    pub fn with_friend_directory(mut self, friends: Arc<dyn FriendDirectory>) -> Self {
        self.friends = friends;
        self
    }

    pub const fn database(&self) -> &DatabaseService {
        &self.db
    }

    /// Run one cycle for `user_id` at the current time.
    pub async fn run_cycle(
        &self,
        user_id: &str,
        actor_token: Option<&str>,
        remote: &RemoteConfig,
        options: &SyncOptions,
    ) -> Result<SyncSummary> {
        self.run_cycle_at(user_id, actor_token, remote, options, now_ms())
            .await
    }

    /// Run one cycle for `user_id` as if the clock read `now` (Unix ms).
    pub async fn run_cycle_at(
        &self,
        user_id: &str,
        actor_token: Option<&str>,
        remote: &RemoteConfig,
        options: &SyncOptions,
        now: i64,
    ) -> Result<SyncSummary> {
        let base_url = match remote.resolve_base_url() {
            Ok(base_url) => base_url,
            Err(unavailable) => {
                tracing::debug!(user_id, reason = unavailable.reason(), "Skipping sync cycle");
                return Ok(SyncSummary {
                    ok: false,
                    reason: Some(unavailable.reason().to_string()),
                    outbox: self.db.count_outbox_by_status(user_id).await?,
                    ..SyncSummary::default()
                });
            }
        };

        let _guard = self.locks.acquire(user_id).await;
        let mut summary = SyncSummary::default();

        let due = self
            .db
            .due_outbox(user_id, now, options.outbox_limit)
            .await?;
        for item in &due {
            self.deliver(&base_url, item, actor_token, options, now, &mut summary)
                .await?;
        }

        let friends = self
            .friends
            .accepted_friends(user_id, options.inbox_friend_limit)
            .await?;
        for friend_user_id in &friends {
            self.pull_conversation(
                &base_url,
                user_id,
                friend_user_id,
                actor_token,
                options,
                now,
                &mut summary,
            )
            .await?;
        }

        summary.outbox = self.db.count_outbox_by_status(user_id).await?;
        summary.ok = summary.failed == 0 && summary.retried == 0 && summary.fetch_errors == 0;

        tracing::info!(
            user_id,
            sent = summary.sent,
            received = summary.received,
            failed = summary.failed,
            retried = summary.retried,
            fetch_errors = summary.fetch_errors,
            "Sync cycle complete"
        );
        Ok(summary)
    }

    async fn deliver(
        &self,
        base_url: &str,
        item: &OutboxItem,
        actor_token: Option<&str>,
        options: &SyncOptions,
        now: i64,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        let request = SendMessageRequest {
            from_user_id: item.from_user_id.clone(),
            to_user_id: item.to_user_id.clone(),
            content_type: item.content_type.as_str().to_string(),
            content: item.content.clone(),
            client_message_id: item.client_message_id.clone(),
            actor_token: actor_token.map(str::to_string),
        };

        let result = with_timeout(
            options.request_timeout,
            self.transport.send_message(base_url, &request),
        )
        .await;

        match result {
            Ok(payload) => {
                let confirmed = payload
                    .as_ref()
                    .and_then(RemoteMessage::from_value)
                    .filter(|remote| remote.client_message_id == item.client_message_id);
                if payload.is_some() && confirmed.is_none() {
                    tracing::debug!(
                        client_message_id = %item.client_message_id,
                        "Discarding unusable send confirmation"
                    );
                }

                self.db
                    .record_delivery(
                        &item.client_message_id,
                        &DeliveryRecord::Sent,
                        confirmed.as_ref(),
                        now,
                    )
                    .await?;
                tracing::debug!(client_message_id = %item.client_message_id, "Delivered message");
                summary.sent += 1;
            }
            Err(error) => {
                let detail = error.to_string();
                let exhausted = item.attempts.saturating_add(1) >= options.max_attempts_before_fail;
                let record = if error.is_terminal() || exhausted {
                    summary.failed += 1;
                    DeliveryRecord::Failed { error: &detail }
                } else {
                    summary.retried += 1;
                    DeliveryRecord::Retry {
                        next_retry_at: next_retry_at(now, item.attempts),
                        error: &detail,
                    }
                };

                tracing::debug!(
                    client_message_id = %item.client_message_id,
                    attempts = item.attempts + 1,
                    error = %detail,
                    "Delivery attempt failed"
                );
                self.db
                    .record_delivery(&item.client_message_id, &record, None, now)
                    .await?;
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn pull_conversation(
        &self,
        base_url: &str,
        user_id: &str,
        friend_user_id: &str,
        actor_token: Option<&str>,
        options: &SyncOptions,
        now: i64,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        let since = self
            .db
            .remote_watermark(user_id, friend_user_id)
            .await?
            .map(format_timestamp_ms);
        let query = ConversationQuery {
            viewer_user_id: user_id.to_string(),
            friend_user_id: friend_user_id.to_string(),
            limit: options.per_conversation_limit,
            since,
            actor_token: actor_token.map(str::to_string),
        };

        let payload = match with_timeout(
            options.request_timeout,
            self.transport.fetch_conversation(base_url, &query),
        )
        .await
        {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(user_id, friend_user_id, %error, "Conversation fetch failed");
                summary.fetch_errors += 1;
                return Ok(());
            }
        };

        let Some(payload) = payload else {
            return Ok(());
        };
        let (items, malformed) = RemoteMessage::from_items(&payload);
        let (items, foreign): (Vec<_>, Vec<_>) = items
            .into_iter()
            .partition(|item| item.is_between(user_id, friend_user_id));
        if malformed + foreign.len() > 0 {
            tracing::debug!(
                friend_user_id,
                malformed,
                foreign = foreign.len(),
                "Discarded remote items"
            );
        }

        let outcomes = self.db.merge_remote_messages(&items, now).await?;
        summary.received += outcomes
            .iter()
            .filter(|outcome| !matches!(outcome, MergeOutcome::Conflict))
            .count();

        Ok(())
    }

    /// Mark a message read locally, then report it to the server.
    ///
    /// The local mark is never rolled back; a failed upstream report is
    /// returned as `remote_synced = false` with the reason.
    pub async fn mark_read_with_sync(
        &self,
        viewer_user_id: &str,
        message_id: &MessageId,
        actor_token: Option<&str>,
        remote: &RemoteConfig,
        options: &SyncOptions,
    ) -> Result<ReadSyncOutcome> {
        let now = now_ms();
        let Some(message) = self
            .db
            .mark_message_read(viewer_user_id, message_id, now)
            .await?
        else {
            return Ok(ReadSyncOutcome {
                ok: false,
                message: None,
                remote_synced: false,
                reason: Some(MESSAGE_NOT_FOUND.to_string()),
            });
        };

        let Some(server_message_id) = message.server_message_id.clone() else {
            return Ok(ReadSyncOutcome::local_only(message, MISSING_SERVER_MESSAGE_ID));
        };
        let base_url = match remote.resolve_base_url() {
            Ok(base_url) => base_url,
            Err(unavailable) => {
                return Ok(ReadSyncOutcome::local_only(message, unavailable.reason()));
            }
        };

        let request = ReadReceiptRequest {
            viewer_user_id: viewer_user_id.to_string(),
            actor_token: actor_token.map(str::to_string),
        };
        let result = with_timeout(
            options.request_timeout,
            self.transport
                .send_read_receipt(&base_url, &server_message_id, &request),
        )
        .await;

        match result {
            Ok(payload) => {
                if let Some(updated) = payload.as_ref().and_then(RemoteMessage::from_value) {
                    self.db.merge_remote_messages(&[updated], now).await?;
                }
                let message = self.db.get_message(message_id).await?.unwrap_or(message);
                Ok(ReadSyncOutcome {
                    ok: true,
                    message: Some(message),
                    remote_synced: true,
                    reason: None,
                })
            }
            Err(error) => {
                tracing::warn!(%server_message_id, %error, "Read receipt not delivered");
                Ok(ReadSyncOutcome::local_only(message, error.to_string()))
            }
        }
    }
}

async fn with_timeout(
    limit: Duration,
    call: impl Future<Output = TransportResult>,
) -> TransportResult {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(TransportError::Timeout(limit)))
}
