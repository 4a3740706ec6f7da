//! Remote transport for the message server.
//!
//! The sync engine is the only caller. Every method receives the base URL
//! resolved for the current call, so a transport holds no connectivity state.
//!
//! Successful calls yield the decoded JSON body, or `None` for an empty
//! body (e.g. `204 No Content`). Failures keep the HTTP status and raw body
//! so the engine can classify them.

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::{MockTransport, RecordedCall};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::util::compact_text;

/// Header carrying the actor identity token on authenticated calls
pub const ACTOR_TOKEN_HEADER: &str = "x-actor-token";

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("{}", describe_http_error(*status, body))]
    Http { status: u16, body: String },

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The call exceeded its time budget.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl TransportError {
    /// HTTP status, when the server produced one
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// A client error other than 429 will fail the same way if retried unmodified.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status()
            .is_some_and(|status| (400..500).contains(&status) && status != 429)
    }
}

/// Body of `POST /v1/messages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub from_user_id: String,
    pub to_user_id: String,
    pub content_type: String,
    pub content: String,
    pub client_message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_token: Option<String>,
}

/// Query of `GET /v1/messages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationQuery {
    pub viewer_user_id: String,
    pub friend_user_id: String,
    pub limit: usize,
    /// RFC 3339 watermark; absent means "everything"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_token: Option<String>,
}

/// Body of `POST /v1/messages/{id}/read`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceiptRequest {
    pub viewer_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_token: Option<String>,
}

pub type TransportResult = Result<Option<Value>, TransportError>;

/// Request/response exchange with the message server
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Deliver one message, keyed by its client message id.
    async fn send_message(&self, base_url: &str, request: &SendMessageRequest) -> TransportResult;

    /// Fetch a conversation, optionally only after a watermark.
    async fn fetch_conversation(&self, base_url: &str, query: &ConversationQuery)
        -> TransportResult;

    /// Report that the viewer read a server-side message.
    async fn send_read_receipt(
        &self,
        base_url: &str,
        server_message_id: &str,
        request: &ReadReceiptRequest,
    ) -> TransportResult;
}

#[derive(serde::Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn describe_http_error(status: u16, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} (HTTP {status})", compact_text(&message));
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("{trimmed} (HTTP {status})")
    }
}
