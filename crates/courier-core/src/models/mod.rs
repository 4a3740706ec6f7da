//! Data models for Courier

mod inbox;
mod message;
mod outbox;
mod remote;

pub use inbox::FriendInboxItem;
pub use message::{
    new_client_message_id, ContentType, Message, MessageId, MessageSource, SyncState,
};
pub use outbox::{NewOutboxMessage, OutboxCounts, OutboxItem, OutboxStatus};
pub use remote::RemoteMessage;
