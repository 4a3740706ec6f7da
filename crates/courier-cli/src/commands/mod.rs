pub mod common;
pub mod completions;
pub mod config;
pub mod conversation;
pub mod friend;
pub mod inbox;
pub mod outbox;
pub mod read;
pub mod send;
pub mod sync;
