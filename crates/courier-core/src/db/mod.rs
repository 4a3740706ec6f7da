//! Database layer for Courier

mod connection;
mod friend_repository;
mod message_repository;
mod migrations;
mod outbox_repository;

pub use connection::Database;
pub use friend_repository::{FriendRepository, SqliteFriendRepository, ACCEPTED};
pub use message_repository::{MergeOutcome, MessageRepository, SqliteMessageRepository};
pub use outbox_repository::{DeliveryRecord, OutboxRepository, SqliteOutboxRepository};
