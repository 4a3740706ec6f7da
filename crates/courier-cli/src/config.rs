//! Persistent CLI connectivity configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use courier_core::util::normalize_text_option;
use courier_core::{ConnectivityMode, RemoteConfig, SyncOptions};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "cli-config.json";

pub const MODE_ENV: &str = "COURIER_MODE";
pub const HOSTED_URL_ENV: &str = "COURIER_HOSTED_URL";
pub const SELF_HOSTED_URL_ENV: &str = "COURIER_SELF_HOSTED_URL";
pub const ACTOR_TOKEN_ENV: &str = "COURIER_ACTOR_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub mode: ConnectivityMode,
    #[serde(default)]
    pub hosted_url: Option<String>,
    #[serde(default)]
    pub self_hosted_url: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_attempts_before_fail: Option<u32>,
}

const fn default_config_version() -> u32 {
    1
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            mode: ConnectivityMode::default(),
            hosted_url: None,
            self_hosted_url: None,
            request_timeout_secs: None,
            max_attempts_before_fail: None,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("courier")
        .join(CONFIG_FILE_NAME)
}

impl CliConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path();
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Apply `COURIER_*` overrides read through `lookup`.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, String> {
        if let Some(raw) = normalize_text_option(lookup(MODE_ENV)) {
            self.mode = ConnectivityMode::parse(&raw)
                .ok_or_else(|| format!("{MODE_ENV} has unknown connectivity mode '{raw}'"))?;
        }
        if let Some(url) = normalize_text_option(lookup(HOSTED_URL_ENV)) {
            self.hosted_url = Some(url);
        }
        if let Some(url) = normalize_text_option(lookup(SELF_HOSTED_URL_ENV)) {
            self.self_hosted_url = Some(url);
        }
        Ok(self)
    }

    /// Configuration from the config file plus process environment.
    pub fn load_effective() -> Result<Self, String> {
        Self::load()?.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn remote_config(&self) -> RemoteConfig {
        RemoteConfig {
            mode: self.mode,
            hosted_url: self.hosted_url.clone(),
            self_hosted_url: self.self_hosted_url.clone(),
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        let defaults = SyncOptions::default();
        SyncOptions {
            request_timeout: self
                .request_timeout_secs
                .filter(|secs| *secs > 0)
                .map_or(defaults.request_timeout, Duration::from_secs),
            max_attempts_before_fail: self
                .max_attempts_before_fail
                .filter(|attempts| *attempts > 0)
                .unwrap_or(defaults.max_attempts_before_fail),
            ..defaults
        }
    }

    fn normalize(&mut self) {
        self.hosted_url = normalize_text_option(self.hosted_url.take());
        self.self_hosted_url = normalize_text_option(self.self_hosted_url.take());
    }
}

/// Explicit token first, then `COURIER_ACTOR_TOKEN`.
pub fn resolve_actor_token(
    explicit: Option<String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    normalize_text_option(explicit).or_else(|| normalize_text_option(lookup(ACTOR_TOKEN_ENV)))
}
