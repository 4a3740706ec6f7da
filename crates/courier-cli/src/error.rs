use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] courier_core::Error),
    #[error(transparent)]
    Transport(#[from] courier_core::transport::TransportError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No message content provided")]
    EmptyContent,
    #[error("User ID cannot be empty")]
    EmptyUserId,
    #[error("Message not found for id: {0}")]
    MessageNotFound(String),
    #[error("Invalid timestamp '{0}': expected RFC 3339 or Unix milliseconds")]
    InvalidTimestamp(String),
    #[error("Configuration error: {0}")]
    Config(String),
}
