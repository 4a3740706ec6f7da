//! Mock transport for testing.
//!
//! Responses are scripted per endpoint and every call is recorded for
//! verification. With nothing scripted, sends echo the request back with a
//! server id of `srv-<client id>`, fetches return no items and read receipts
//! return an empty body.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    ConversationQuery, ReadReceiptRequest, RemoteTransport, SendMessageRequest, TransportResult,
};

/// A call observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Send {
        base_url: String,
        request: SendMessageRequest,
    },
    Fetch {
        base_url: String,
        query: ConversationQuery,
    },
    ReadReceipt {
        base_url: String,
        server_message_id: String,
        request: ReadReceiptRequest,
    },
}

/// Mock transport for testing.
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    calls: Vec<RecordedCall>,
    send_responses: VecDeque<TransportResult>,
    fetch_responses: HashMap<String, VecDeque<TransportResult>>,
    read_responses: VecDeque<TransportResult>,
    delay: Option<Duration>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the result of the next `send_message` call.
    pub fn queue_send(&self, result: TransportResult) {
        self.lock().send_responses.push_back(result);
    }

    /// Queue the result of the next fetch for `friend_user_id`.
    pub fn queue_fetch(&self, friend_user_id: &str, result: TransportResult) {
        self.lock()
            .fetch_responses
            .entry(friend_user_id.to_string())
            .or_default()
            .push_back(result);
    }

    /// Queue the result of the next `send_read_receipt` call.
    pub fn queue_read_receipt(&self, result: TransportResult) {
        self.lock().read_responses.push_back(result);
    }

    /// Delay every call, e.g. to exercise timeouts or overlapping cycles.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    /// All calls made so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Send requests made so far.
    pub fn sent_requests(&self) -> Vec<SendMessageRequest> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Send { request, .. } => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// Fetch queries made so far.
    pub fn fetch_queries(&self) -> Vec<ConversationQuery> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Fetch { query, .. } => Some(query.clone()),
                _ => None,
            })
            .collect()
    }

    async fn pause(&self) {
        let delay = self.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

/// The representation a well-behaved server returns for an accepted send
pub fn echo_payload(request: &SendMessageRequest) -> Value {
    json!({
        "id": format!("srv-{}", request.client_message_id),
        "clientMessageId": request.client_message_id,
        "fromUserId": request.from_user_id,
        "toUserId": request.to_user_id,
        "contentType": request.content_type,
        "content": request.content,
        "createdAt": "2024-01-01T00:00:00.000Z",
        "readAt": null,
    })
}

#[async_trait]
impl RemoteTransport for MockTransport {
    async fn send_message(&self, base_url: &str, request: &SendMessageRequest) -> TransportResult {
        let scripted = {
            let mut inner = self.lock();
            inner.calls.push(RecordedCall::Send {
                base_url: base_url.to_string(),
                request: request.clone(),
            });
            inner.send_responses.pop_front()
        };
        self.pause().await;
        scripted.unwrap_or_else(|| Ok(Some(echo_payload(request))))
    }

    async fn fetch_conversation(
        &self,
        base_url: &str,
        query: &ConversationQuery,
    ) -> TransportResult {
        let scripted = {
            let mut inner = self.lock();
            inner.calls.push(RecordedCall::Fetch {
                base_url: base_url.to_string(),
                query: query.clone(),
            });
            inner
                .fetch_responses
                .get_mut(&query.friend_user_id)
                .and_then(VecDeque::pop_front)
        };
        self.pause().await;
        scripted.unwrap_or_else(|| Ok(Some(json!({ "items": [] }))))
    }

    async fn send_read_receipt(
        &self,
        base_url: &str,
        server_message_id: &str,
        request: &ReadReceiptRequest,
    ) -> TransportResult {
        let scripted = {
            let mut inner = self.lock();
            inner.calls.push(RecordedCall::ReadReceipt {
                base_url: base_url.to_string(),
                server_message_id: server_message_id.to_string(),
                request: request.clone(),
            });
            inner.read_responses.pop_front()
        };
        self.pause().await;
        scripted.unwrap_or(Ok(None))
    }
}
