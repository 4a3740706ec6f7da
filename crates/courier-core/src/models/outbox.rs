//! Outbox item model

use serde::{Deserialize, Serialize};

use super::ContentType;

/// Delivery status of an outbox item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Retry,
    Sent,
    Failed,
}

impl OutboxStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Retry => "retry",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "retry" => Some(Self::Retry),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal items never re-enter a sync cycle
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }
}

/// A message the user intends to deliver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxItem {
    /// Idempotency key, unique per item
    pub client_message_id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub content: String,
    pub content_type: ContentType,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    pub status: OutboxStatus,
    /// Number of delivery attempts made so far
    pub attempts: u32,
    /// Earliest time of the next attempt (Unix ms)
    pub next_retry_at: Option<i64>,
    pub last_error: Option<String>,
    /// Last mutation timestamp (Unix ms)
    pub updated_at: i64,
}

/// Input for queueing a new outgoing message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewOutboxMessage {
    pub from_user_id: String,
    pub to_user_id: String,
    pub content: String,
    pub content_type: Option<ContentType>,
    /// Generated when omitted
    pub client_message_id: Option<String>,
    /// RFC 3339; malformed or missing values fall back to now
    pub created_at: Option<String>,
}

impl NewOutboxMessage {
    pub fn text(
        from_user_id: impl Into<String>,
        to_user_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            from_user_id: from_user_id.into(),
            to_user_id: to_user_id.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_client_message_id(mut self, client_message_id: impl Into<String>) -> Self {
        self.client_message_id = Some(client_message_id.into());
        self
    }
}

/// Outbox item counts per status for one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxCounts {
    pub pending: usize,
    pub retry: usize,
    pub sent: usize,
    pub failed: usize,
}

impl OutboxCounts {
    pub(crate) fn add(&mut self, status: OutboxStatus, count: usize) {
        match status {
            OutboxStatus::Pending => self.pending += count,
            OutboxStatus::Retry => self.retry += count,
            OutboxStatus::Sent => self.sent += count,
            OutboxStatus::Failed => self.failed += count,
        }
    }

    /// Items that a future cycle will still attempt
    #[must_use]
    pub const fn outstanding(&self) -> usize {
        self.pending + self.retry
    }
}
