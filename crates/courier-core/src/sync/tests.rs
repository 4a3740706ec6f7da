use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use super::*;
use crate::config::{ConnectivityMode, RemoteConfig, SyncOptions};
use crate::models::{MessageSource, NewOutboxMessage, OutboxStatus, SyncState};
use crate::transport::{MockTransport, RecordedCall, TransportError};

const BASE_URL: &str = "https://api.example.com";
const T0: i64 = 1_700_000_000_000;

struct Harness {
    engine: SyncEngine,
    transport: MockTransport,
    remote: RemoteConfig,
    options: SyncOptions,
}

impl Harness {
    async fn new() -> Self {
        let db = DatabaseService::open_in_memory().await.unwrap();
        let transport = MockTransport::new();
        let engine = SyncEngine::new(db, Arc::new(transport.clone()));
        Self {
            engine,
            transport,
            remote: RemoteConfig::hosted(format!("{BASE_URL}/")),
            options: SyncOptions::default(),
        }
    }

    fn db(&self) -> &DatabaseService {
        self.engine.database()
    }

    async fn enqueue(&self, client_id: &str, from: &str, to: &str, content: &str) -> OutboxItem {
        self.db()
            .enqueue_message(NewOutboxMessage::text(from, to, content).with_client_message_id(client_id))
            .await
            .unwrap()
    }

    async fn cycle(&self, user_id: &str, now: i64) -> SyncSummary {
        self.engine
            .run_cycle_at(user_id, Some("token-1"), &self.remote, &self.options, now)
            .await
            .unwrap()
    }

    async fn outbox_item(&self, client_id: &str) -> OutboxItem {
        self.db().get_outbox_item(client_id).await.unwrap().unwrap()
    }
}

fn wire(server_id: &str, client_id: &str, from: &str, to: &str, created_at: &str) -> Value {
    json!({
        "id": server_id,
        "clientMessageId": client_id,
        "fromUserId": from,
        "toUserId": to,
        "contentType": "text",
        "content": format!("{client_id} body"),
        "createdAt": created_at,
    })
}

fn http(status: u16) -> TransportError {
    TransportError::Http {
        status,
        body: String::new(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn single_send_is_delivered_and_merged_once() {
    let harness = Harness::new().await;
    harness.db().add_friend("alice", "bob").await.unwrap();
    harness.enqueue("c1", "alice", "bob", "hello bob").await;

    let confirmation = wire("s1", "c1", "alice", "bob", "2024-05-01T10:00:00Z");
    harness.transport.queue_send(Ok(Some(confirmation.clone())));
    harness
        .transport
        .queue_fetch("bob", Ok(Some(json!({ "items": [confirmation] }))));

    let summary = harness.cycle("alice", T0).await;
    assert_eq!(
        summary,
        SyncSummary {
            ok: true,
            reason: None,
            sent: 1,
            received: 1,
            failed: 0,
            retried: 0,
            fetch_errors: 0,
            outbox: OutboxCounts {
                sent: 1,
                ..OutboxCounts::default()
            },
        }
    );

    let sent = harness.transport.sent_requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].client_message_id, "c1");
    assert_eq!(sent[0].content, "hello bob");
    assert_eq!(sent[0].actor_token.as_deref(), Some("token-1"));
    assert!(matches!(
        &harness.transport.calls()[0],
        RecordedCall::Send { base_url, .. } if base_url == BASE_URL
    ));

    let conversation = harness
        .db()
        .list_conversation("alice", "bob", None, 50)
        .await
        .unwrap();
    assert_eq!(conversation.len(), 1);
    let message = &conversation[0];
    assert_eq!(message.server_message_id.as_deref(), Some("s1"));
    assert_eq!(message.client_message_id, "c1");
    assert_eq!(message.source, MessageSource::Local);
    assert_eq!(message.sync_state, SyncState::Synced);

    let item = harness.outbox_item("c1").await;
    assert_eq!(item.status, OutboxStatus::Sent);
    assert_eq!(item.attempts, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn success_without_usable_body_still_marks_sent() {
    let harness = Harness::new().await;
    harness.enqueue("c1", "alice", "bob", "no echo").await;
    harness.enqueue("c2", "alice", "bob", "odd echo").await;
    harness.transport.queue_send(Ok(None));
    harness.transport.queue_send(Ok(Some(json!("accepted"))));

    let summary = harness.cycle("alice", T0).await;
    assert_eq!(summary.sent, 2);
    assert_eq!(summary.retried, 0);
    assert!(summary.ok);

    for client_id in ["c1", "c2"] {
        let item = harness.outbox_item(client_id).await;
        assert_eq!(item.status, OutboxStatus::Sent);
        assert_eq!(item.attempts, 1);
    }
    let cycle_again = harness.cycle("alice", T0 + 1).await;
    assert_eq!(cycle_again.sent, 0);
    assert_eq!(harness.transport.sent_requests().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn repeated_cycles_are_idempotent() {
    let harness = Harness::new().await;
    harness.db().add_friend("alice", "bob").await.unwrap();
    harness.enqueue("c1", "alice", "bob", "hello").await;

    let incoming = wire("s2", "b1", "bob", "alice", "2024-05-01T10:00:00Z");
    for _ in 0..3 {
        harness
            .transport
            .queue_fetch("bob", Ok(Some(json!([incoming.clone()]))));
    }

    for offset in 0..3 {
        harness.cycle("alice", T0 + offset).await;
    }

    assert_eq!(harness.transport.sent_requests().len(), 1);
    let conversation = harness
        .db()
        .list_conversation("alice", "bob", None, 50)
        .await
        .unwrap();
    assert_eq!(conversation.len(), 2);
    assert_eq!(harness.db().count_outbox_by_status("alice").await.unwrap().sent, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn transient_failures_back_off_until_delivery() {
    let harness = Harness::new().await;
    harness.enqueue("c1", "alice", "bob", "persistent").await;
    for _ in 0..5 {
        harness.transport.queue_send(Err(http(500)));
    }

    let mut now = T0;
    for attempt in 0..5_u32 {
        let summary = harness.cycle("alice", now).await;
        assert_eq!(summary.retried, 1, "cycle {attempt}");
        assert!(!summary.ok);
        assert_eq!(summary.outbox.retry, 1);

        let item = harness.outbox_item("c1").await;
        assert_eq!(item.status, OutboxStatus::Retry);
        assert_eq!(item.attempts, attempt + 1);
        assert_eq!(item.next_retry_at, Some(next_retry_at(now, attempt)));
        assert_eq!(item.last_error.as_deref(), Some("HTTP 500"));

        // Not due yet: nothing is sent.
        let early = harness.cycle("alice", now + 1).await;
        assert_eq!(early.retried + early.sent, 0);

        now = item.next_retry_at.unwrap();
    }

    let summary = harness.cycle("alice", now).await;
    assert_eq!(summary.sent, 1);
    assert!(summary.ok);
    assert_eq!(harness.transport.sent_requests().len(), 6);

    let item = harness.outbox_item("c1").await;
    assert_eq!(item.status, OutboxStatus::Sent);
    assert_eq!(item.attempts, 6);
    let message = harness.db().get_message_by_client_id("c1").await.unwrap().unwrap();
    assert_eq!(message.sync_state, SyncState::Synced);
    assert_eq!(message.server_message_id.as_deref(), Some("srv-c1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn client_error_fails_on_first_attempt() {
    let harness = Harness::new().await;
    harness.enqueue("c1", "alice", "ghost", "hello?").await;
    harness.transport.queue_send(Err(TransportError::Http {
        status: 404,
        body: r#"{"error":"recipient not found"}"#.to_string(),
    }));

    let summary = harness.cycle("alice", T0).await;
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.retried, 0);
    assert!(!summary.ok);
    assert_eq!(summary.outbox.failed, 1);

    let item = harness.outbox_item("c1").await;
    assert_eq!(item.status, OutboxStatus::Failed);
    assert_eq!(item.attempts, 1);
    assert_eq!(item.next_retry_at, None);
    assert_eq!(item.last_error.as_deref(), Some("recipient not found (HTTP 404)"));

    let message = harness.db().get_message_by_client_id("c1").await.unwrap().unwrap();
    assert_eq!(message.sync_state, SyncState::Failed);

    // Terminal items never re-enter a cycle.
    harness.cycle("alice", T0 + 86_400_000).await;
    assert_eq!(harness.transport.sent_requests().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn rate_limited_sends_are_retried() {
    let harness = Harness::new().await;
    harness.enqueue("c1", "alice", "bob", "slow down").await;
    harness.transport.queue_send(Err(http(429)));

    let summary = harness.cycle("alice", T0).await;
    assert_eq!(summary.retried, 1);
    assert_eq!(harness.outbox_item("c1").await.status, OutboxStatus::Retry);
}

#[tokio::test(flavor = "multi_thread")]
async fn server_errors_fail_at_attempt_ceiling() {
    let harness = Harness::new().await;
    harness.enqueue("c1", "alice", "bob", "doomed").await;
    for _ in 0..6 {
        harness.transport.queue_send(Err(http(503)));
    }

    let mut now = T0;
    for _ in 0..5 {
        let summary = harness.cycle("alice", now).await;
        assert_eq!(summary.retried, 1);
        now = harness.outbox_item("c1").await.next_retry_at.unwrap();
    }

    let summary = harness.cycle("alice", now).await;
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.retried, 0);

    let item = harness.outbox_item("c1").await;
    assert_eq!(item.status, OutboxStatus::Failed);
    assert_eq!(item.attempts, 6);
    assert_eq!(item.last_error.as_deref(), Some("HTTP 503"));
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_cycle_short_circuits_without_mutation() {
    let mut harness = Harness::new().await;
    harness.db().add_friend("alice", "bob").await.unwrap();
    harness.enqueue("c1", "alice", "bob", "later").await;
    harness.remote = RemoteConfig::local_only();

    let summary = harness.cycle("alice", T0).await;
    assert_eq!(
        summary,
        SyncSummary {
            ok: false,
            reason: Some("local_only_mode".to_string()),
            outbox: OutboxCounts {
                pending: 1,
                ..OutboxCounts::default()
            },
            ..SyncSummary::default()
        }
    );
    assert!(harness.transport.calls().is_empty());

    let item = harness.outbox_item("c1").await;
    assert_eq!(item.status, OutboxStatus::Pending);
    assert_eq!(item.attempts, 0);
    assert_eq!(item.updated_at, item.created_at);

    harness.remote = RemoteConfig {
        mode: ConnectivityMode::Hosted,
        ..RemoteConfig::default()
    };
    let summary = harness.cycle("alice", T0).await;
    assert_eq!(summary.reason.as_deref(), Some("missing_hosted_url"));
    assert!(harness.transport.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn lost_confirmation_never_duplicates_the_message() {
    let harness = Harness::new().await;
    harness.db().add_friend("alice", "bob").await.unwrap();
    harness.enqueue("c1", "alice", "bob", "did it arrive?").await;

    // The server stored the message but the response never made it back.
    harness
        .transport
        .queue_send(Err(TransportError::Network("connection reset".to_string())));
    let stored = wire("s1", "c1", "alice", "bob", "2024-05-01T10:00:00Z");
    harness
        .transport
        .queue_fetch("bob", Ok(Some(json!({ "items": [stored.clone()] }))));

    let summary = harness.cycle("alice", T0).await;
    assert_eq!(summary.retried, 1);
    assert_eq!(summary.received, 1);

    // The retry is deduplicated by the server on the client message id.
    harness.transport.queue_send(Ok(Some(stored)));
    let now = harness.outbox_item("c1").await.next_retry_at.unwrap();
    let summary = harness.cycle("alice", now).await;
    assert_eq!(summary.sent, 1);

    let conversation = harness
        .db()
        .list_conversation("alice", "bob", None, 50)
        .await
        .unwrap();
    assert_eq!(conversation.len(), 1);
    assert_eq!(conversation[0].server_message_id.as_deref(), Some("s1"));
    assert_eq!(conversation[0].sync_state, SyncState::Synced);
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_discards_malformed_and_foreign_items() {
    let harness = Harness::new().await;
    harness.db().add_friend("alice", "bob").await.unwrap();
    harness.transport.queue_fetch(
        "bob",
        Ok(Some(json!({
            "items": [
                wire("s1", "b1", "bob", "alice", "2024-05-01T10:00:00Z"),
                { "id": "s2", "clientMessageId": "b2", "fromUserId": "bob", "toUserId": "alice" },
                wire("s3", "x1", "carol", "dave", "2024-05-01T10:00:00Z"),
                "not even an object",
                {
                    "message": {
                        "server_message_id": 4,
                        "client_id": "b4",
                        "from": "bob",
                        "to": "alice",
                        "body": "snake case",
                        "created_at": 1_714_557_660_000_i64
                    }
                }
            ]
        }))),
    );

    let summary = harness.cycle("alice", T0).await;
    assert_eq!(summary.received, 2);
    assert!(summary.ok);

    let conversation = harness
        .db()
        .list_conversation("alice", "bob", None, 50)
        .await
        .unwrap();
    let server_ids: Vec<_> = conversation
        .iter()
        .filter_map(|message| message.server_message_id.as_deref())
        .collect();
    assert_eq!(server_ids, vec!["s1", "4"]);
    assert!(conversation
        .iter()
        .all(|message| message.source == MessageSource::Remote));
    assert!(harness.db().list_inbox("carol", 10).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_error_for_one_friend_does_not_stop_the_others() {
    let harness = Harness::new().await;
    harness.db().add_friend("alice", "bob").await.unwrap();
    harness.db().add_friend("alice", "carol").await.unwrap();
    harness.transport.queue_fetch("bob", Err(http(500)));
    harness.transport.queue_fetch(
        "carol",
        Ok(Some(json!([wire("s1", "k1", "carol", "alice", "2024-05-01T10:00:00Z")]))),
    );

    let summary = harness.cycle("alice", T0).await;
    assert_eq!(summary.fetch_errors, 1);
    assert_eq!(summary.received, 1);
    assert!(!summary.ok);
    assert_eq!(harness.transport.fetch_queries().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_resumes_from_remote_watermark() {
    let mut harness = Harness::new().await;
    harness.db().add_friend("alice", "bob").await.unwrap();
    harness.transport.queue_fetch(
        "bob",
        Ok(Some(json!([wire("s1", "b1", "bob", "alice", "2024-05-01T10:00:00Z")]))),
    );

    harness.cycle("alice", T0).await;
    // An unconfirmed local message must not advance the watermark.
    harness.enqueue("c9", "alice", "bob", "offline reply").await;
    harness.remote.mode = ConnectivityMode::LocalOnly;
    harness.cycle("alice", T0).await;
    harness.remote = RemoteConfig::hosted(BASE_URL);
    harness.transport.queue_send(Err(http(503)));
    harness.cycle("alice", T0 + 1).await;

    let queries = harness.transport.fetch_queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].since, None);
    assert_eq!(queries[0].limit, 200);
    assert_eq!(queries[0].actor_token.as_deref(), Some("token-1"));
    assert_eq!(queries[1].since.as_deref(), Some("2024-05-01T10:00:00.000Z"));
}

#[tokio::test(flavor = "multi_thread")]
async fn confirmed_own_message_advances_watermark() {
    let harness = Harness::new().await;
    harness.db().add_friend("alice", "bob").await.unwrap();
    harness.enqueue("c1", "alice", "bob", "anyone there?").await;

    let confirmation = wire("s1", "c1", "alice", "bob", "2024-05-01T10:00:00Z");
    harness.transport.queue_send(Ok(Some(confirmation.clone())));
    harness
        .transport
        .queue_fetch("bob", Ok(Some(json!({ "items": [confirmation] }))));

    let first = harness.cycle("alice", T0).await;
    assert_eq!(first.sent, 1);
    let second = harness.cycle("alice", T0 + 1).await;
    let third = harness.cycle("alice", T0 + 2).await;

    let since: Vec<_> = harness
        .transport
        .fetch_queries()
        .into_iter()
        .map(|query| query.since)
        .collect();
    assert_eq!(
        since,
        vec![
            Some("2024-05-01T10:00:00.000Z".to_string()),
            Some("2024-05-01T10:00:00.000Z".to_string()),
            Some("2024-05-01T10:00:00.000Z".to_string()),
        ]
    );
    assert_eq!(second.received, 0);
    assert_eq!(third.received, 0);
    assert_eq!(
        harness
            .db()
            .list_conversation("alice", "bob", None, 50)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn outbox_limit_bounds_each_cycle() {
    let mut harness = Harness::new().await;
    harness.options.outbox_limit = 2;
    for (index, client_id) in ["c1", "c2", "c3"].iter().enumerate() {
        let mut input = NewOutboxMessage::text("alice", "bob", "batch").with_client_message_id(*client_id);
        input.created_at = Some(format!("2024-05-01T10:00:0{index}Z"));
        harness.db().enqueue_message(input).await.unwrap();
    }

    let summary = harness.cycle("alice", T0).await;
    assert_eq!(summary.sent, 2);
    assert_eq!(summary.outbox.pending, 1);
    let order: Vec<_> = harness
        .transport
        .sent_requests()
        .into_iter()
        .map(|request| request.client_message_id)
        .collect();
    assert_eq!(order, vec!["c1", "c2"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_server_counts_as_retryable_timeout() {
    let mut harness = Harness::new().await;
    harness.db().add_friend("alice", "bob").await.unwrap();
    harness.options.request_timeout = Duration::from_millis(50);
    harness.transport.set_delay(Duration::from_millis(500));
    harness.enqueue("c1", "alice", "bob", "tick tock").await;

    let summary = harness.cycle("alice", T0).await;
    assert_eq!(summary.retried, 1);
    assert_eq!(summary.fetch_errors, 1);

    let item = harness.outbox_item("c1").await;
    assert_eq!(item.status, OutboxStatus::Retry);
    assert!(item
        .last_error
        .as_deref()
        .is_some_and(|error| error.contains("timed out")));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_cycles_for_one_user_deliver_once() {
    let harness = Harness::new().await;
    harness.transport.set_delay(Duration::from_millis(100));
    harness.enqueue("c1", "alice", "bob", "only once").await;

    let (first, second) = tokio::join!(harness.cycle("alice", T0), harness.cycle("alice", T0));

    assert_eq!(first.sent + second.sent, 1);
    assert_eq!(harness.transport.sent_requests().len(), 1);
    assert_eq!(first.outbox.sent, 1);
    assert_eq!(second.outbox.sent, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn read_mark_survives_offline_and_later_fetches() {
    let mut harness = Harness::new().await;
    harness.db().add_friend("alice", "bob").await.unwrap();
    let incoming = wire("s9", "b9", "bob", "alice", "2024-05-01T10:00:00Z");
    harness
        .transport
        .queue_fetch("bob", Ok(Some(json!([incoming.clone()]))));
    harness.cycle("alice", T0).await;

    let message = harness.db().get_message_by_client_id("b9").await.unwrap().unwrap();
    assert_eq!(harness.db().list_inbox("alice", 10).await.unwrap()[0].unread_count, 1);

    harness.remote = RemoteConfig::local_only();
    let outcome = harness
        .engine
        .mark_read_with_sync("alice", &message.id, None, &harness.remote, &harness.options)
        .await
        .unwrap();
    assert!(outcome.ok);
    assert!(!outcome.remote_synced);
    assert_eq!(outcome.reason.as_deref(), Some("local_only_mode"));
    let read_at = outcome.message.unwrap().read_at.unwrap();

    // The server still reports the message unread; the local mark wins.
    harness.remote = RemoteConfig::hosted(BASE_URL);
    harness.transport.queue_fetch("bob", Ok(Some(json!([incoming]))));
    harness.cycle("alice", T0 + 1).await;

    let stored = harness.db().get_message(&message.id).await.unwrap().unwrap();
    assert_eq!(stored.read_at, Some(read_at));
    assert_eq!(harness.db().list_inbox("alice", 10).await.unwrap()[0].unread_count, 0);

    let outcome = harness
        .engine
        .mark_read_with_sync("alice", &message.id, Some("token-1"), &harness.remote, &harness.options)
        .await
        .unwrap();
    assert!(outcome.remote_synced);
    assert_eq!(outcome.message.unwrap().read_at, Some(read_at));
    let receipt = harness.transport.calls().into_iter().find_map(|call| match call {
        RecordedCall::ReadReceipt {
            server_message_id,
            request,
            ..
        } => Some((server_message_id, request)),
        _ => None,
    });
    let (server_message_id, request) = receipt.unwrap();
    assert_eq!(server_message_id, "s9");
    assert_eq!(request.viewer_user_id, "alice");
    assert_eq!(request.actor_token.as_deref(), Some("token-1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn read_receipt_failure_keeps_local_mark() {
    let harness = Harness::new().await;
    harness.db().add_friend("alice", "bob").await.unwrap();
    harness.transport.queue_fetch(
        "bob",
        Ok(Some(json!([wire("s9", "b9", "bob", "alice", "2024-05-01T10:00:00Z")]))),
    );
    harness.cycle("alice", T0).await;
    let message = harness.db().get_message_by_client_id("b9").await.unwrap().unwrap();

    harness.transport.queue_read_receipt(Err(http(500)));
    let outcome = harness
        .engine
        .mark_read_with_sync("alice", &message.id, None, &harness.remote, &harness.options)
        .await
        .unwrap();

    assert!(outcome.ok);
    assert!(!outcome.remote_synced);
    assert_eq!(outcome.reason.as_deref(), Some("HTTP 500"));
    let stored = harness.db().get_message(&message.id).await.unwrap().unwrap();
    assert!(stored.read_at.is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn read_receipt_requires_recipient_and_server_id() {
    let harness = Harness::new().await;
    harness.enqueue("c1", "alice", "bob", "mine").await;
    harness.enqueue("b1", "bob", "alice", "queued on this device").await;
    let mine = harness.db().get_message_by_client_id("c1").await.unwrap().unwrap();
    let theirs = harness.db().get_message_by_client_id("b1").await.unwrap().unwrap();

    let outcome = harness
        .engine
        .mark_read_with_sync("alice", &mine.id, None, &harness.remote, &harness.options)
        .await
        .unwrap();
    assert!(!outcome.ok);
    assert_eq!(outcome.message, None);
    assert_eq!(outcome.reason.as_deref(), Some(MESSAGE_NOT_FOUND));

    let outcome = harness
        .engine
        .mark_read_with_sync("alice", &theirs.id, None, &harness.remote, &harness.options)
        .await
        .unwrap();
    assert!(outcome.ok);
    assert!(!outcome.remote_synced);
    assert_eq!(outcome.reason.as_deref(), Some(MISSING_SERVER_MESSAGE_ID));
    assert!(harness.transport.calls().is_empty());
}

struct StaticFriends(Vec<String>);

#[async_trait]
impl FriendDirectory for StaticFriends {
    async fn accepted_friends(&self, _user_id: &str, limit: usize) -> Result<Vec<String>> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn custom_friend_directory_bounds_pulled_conversations() {
    let mut harness = Harness::new().await;
    harness.options.inbox_friend_limit = 2;
    harness.engine = harness.engine.clone().with_friend_directory(Arc::new(StaticFriends(vec![
        "bob".to_string(),
        "carol".to_string(),
        "dave".to_string(),
    ])));

    harness.cycle("alice", T0).await;

    let friends: Vec<_> = harness
        .transport
        .fetch_queries()
        .into_iter()
        .map(|query| query.friend_user_id)
        .collect();
    assert_eq!(friends, vec!["bob", "carol"]);
}
