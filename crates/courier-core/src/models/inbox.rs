//! Derived inbox projection

use serde::{Deserialize, Serialize};

use super::ContentType;

/// Per-friend conversation summary, recomputed from message rows on every query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendInboxItem {
    pub friend_user_id: String,
    /// Creation timestamp of the newest message (Unix ms)
    pub last_message_at: i64,
    pub last_message_content: String,
    pub last_message_content_type: ContentType,
    /// Incoming messages the viewer has not read yet
    pub unread_count: usize,
}
