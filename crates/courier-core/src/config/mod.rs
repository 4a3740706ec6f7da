//! Remote endpoint and sync tuning configuration.
//!
//! Both values are plain data handed to the engine on every call, so callers
//! (and tests) can switch connectivity mode between cycles.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_OUTBOX_LIMIT: usize = 50;
const DEFAULT_INBOX_FRIEND_LIMIT: usize = 100;
const DEFAULT_PER_CONVERSATION_LIMIT: usize = 200;
const DEFAULT_MAX_ATTEMPTS_BEFORE_FAIL: u32 = 6;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// How the app reaches (or doesn't reach) a message server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityMode {
    /// Never talk to a server
    #[default]
    LocalOnly,
    /// The managed service endpoint
    Hosted,
    /// A user-provided server
    SelfHosted,
}

impl ConnectivityMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LocalOnly => "local_only",
            Self::Hosted => "hosted",
            Self::SelfHosted => "self_hosted",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "local_only" | "local" | "offline" => Some(Self::LocalOnly),
            "hosted" | "managed" => Some(Self::Hosted),
            "self_hosted" => Some(Self::SelfHosted),
            _ => None,
        }
    }
}

/// Why no remote base URL is available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportUnavailable {
    LocalOnlyMode,
    MissingHostedUrl,
    InvalidHostedUrl,
    MissingSelfHostedUrl,
    InvalidSelfHostedUrl,
}

impl TransportUnavailable {
    /// Stable reason code reported in summaries
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::LocalOnlyMode => "local_only_mode",
            Self::MissingHostedUrl => "missing_hosted_url",
            Self::InvalidHostedUrl => "invalid_hosted_url",
            Self::MissingSelfHostedUrl => "missing_self_hosted_url",
            Self::InvalidSelfHostedUrl => "invalid_self_hosted_url",
        }
    }
}

impl fmt::Display for TransportUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Connectivity settings used to resolve the message server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub mode: ConnectivityMode,
    #[serde(default)]
    pub hosted_url: Option<String>,
    #[serde(default)]
    pub self_hosted_url: Option<String>,
}

impl RemoteConfig {
    /// Local-only configuration; every sync short-circuits
    #[must_use]
    pub fn local_only() -> Self {
        Self::default()
    }

    pub fn hosted(url: impl Into<String>) -> Self {
        Self {
            mode: ConnectivityMode::Hosted,
            hosted_url: Some(url.into()),
            self_hosted_url: None,
        }
    }

    pub fn self_hosted(url: impl Into<String>) -> Self {
        Self {
            mode: ConnectivityMode::SelfHosted,
            hosted_url: None,
            self_hosted_url: Some(url.into()),
        }
    }

    /// Resolve the API base URL for the current mode.
    ///
    /// The returned URL never ends with `/`.
    pub fn resolve_base_url(&self) -> Result<String, TransportUnavailable> {
        match self.mode {
            ConnectivityMode::LocalOnly => Err(TransportUnavailable::LocalOnlyMode),
            ConnectivityMode::Hosted => validate_base_url(
                self.hosted_url.clone(),
                TransportUnavailable::MissingHostedUrl,
                TransportUnavailable::InvalidHostedUrl,
            ),
            ConnectivityMode::SelfHosted => validate_base_url(
                self.self_hosted_url.clone(),
                TransportUnavailable::MissingSelfHostedUrl,
                TransportUnavailable::InvalidSelfHostedUrl,
            ),
        }
    }
}

fn validate_base_url(
    raw: Option<String>,
    missing: TransportUnavailable,
    invalid: TransportUnavailable,
) -> Result<String, TransportUnavailable> {
    let url = normalize_text_option(raw).ok_or(missing)?;
    let url = url.trim_end_matches('/');
    if !is_http_url(url) || url.contains(char::is_whitespace) {
        return Err(invalid);
    }

    let host = url
        .split_once("://")
        .map(|(_, rest)| rest.split(['/', '?', '#']).next().unwrap_or_default())
        .unwrap_or_default();
    if host.is_empty() {
        return Err(invalid);
    }

    Ok(url.to_string())
}

/// Tunable limits for one sync cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Maximum outbox items delivered per cycle
    pub outbox_limit: usize,
    /// Maximum friends polled per cycle
    pub inbox_friend_limit: usize,
    /// Maximum messages requested per conversation fetch
    pub per_conversation_limit: usize,
    /// Retryable failures convert to terminal ones at this attempt count
    pub max_attempts_before_fail: u32,
    /// Upper bound for every remote call
    pub request_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            outbox_limit: DEFAULT_OUTBOX_LIMIT,
            inbox_friend_limit: DEFAULT_INBOX_FRIEND_LIMIT,
            per_conversation_limit: DEFAULT_PER_CONVERSATION_LIMIT,
            max_attempts_before_fail: DEFAULT_MAX_ATTEMPTS_BEFORE_FAIL,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}
