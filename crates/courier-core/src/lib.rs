//! courier-core - Core library for Courier
//!
//! This crate contains the message store, outbox queue, remote transport and
//! sync engine used by every Courier interface.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod sync;
pub mod transport;
pub mod util;

pub use config::{ConnectivityMode, RemoteConfig, SyncOptions, TransportUnavailable};
pub use error::{Error, Result};
pub use models::{Message, MessageId, NewOutboxMessage, OutboxCounts, OutboxItem, OutboxStatus};
pub use services::DatabaseService;
pub use sync::{ReadSyncOutcome, SyncEngine, SyncSummary};
pub use transport::{HttpTransport, RemoteTransport};
