use courier_core::util::{is_http_url, normalize_text_option};
use courier_core::ConnectivityMode;
use serde::Serialize;

use crate::cli::{ConfigCommands, ModeArg};
use crate::config::{default_config_path, CliConfig};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct EffectiveConfig<'a> {
    config_path: String,
    mode: ConnectivityMode,
    hosted_url: Option<&'a str>,
    self_hosted_url: Option<&'a str>,
    base_url: Option<String>,
    unavailable_reason: Option<&'static str>,
    request_timeout_secs: u64,
    max_attempts_before_fail: u32,
}

pub fn run_config(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show { json } => run_config_show(json),
        ConfigCommands::Set {
            mode,
            hosted_url,
            self_hosted_url,
            request_timeout_secs,
            max_attempts,
        } => {
            let mut config = CliConfig::load().map_err(CliError::Config)?;
            apply_config_update(
                &mut config,
                mode,
                hosted_url,
                self_hosted_url,
                request_timeout_secs,
                max_attempts,
            )?;
            let path = config.save().map_err(CliError::Config)?;
            println!("Saved config to {}", path.display());
            Ok(())
        }
    }
}

fn run_config_show(as_json: bool) -> Result<(), CliError> {
    let config = CliConfig::load_effective().map_err(CliError::Config)?;
    let resolved = config.remote_config().resolve_base_url();
    let options = config.sync_options();
    let effective = EffectiveConfig {
        config_path: default_config_path().display().to_string(),
        mode: config.mode,
        hosted_url: config.hosted_url.as_deref(),
        self_hosted_url: config.self_hosted_url.as_deref(),
        base_url: resolved.as_ref().ok().cloned(),
        unavailable_reason: resolved.as_ref().err().map(|reason| reason.reason()),
        request_timeout_secs: options.request_timeout.as_secs(),
        max_attempts_before_fail: options.max_attempts_before_fail,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&effective)?);
        return Ok(());
    }

    println!("config: {}", effective.config_path);
    println!("mode: {}", effective.mode.as_str());
    match (&effective.base_url, effective.unavailable_reason) {
        (Some(base_url), _) => println!("server: {base_url}"),
        (None, Some(reason)) => println!("server: unavailable ({reason})"),
        (None, None) => println!("server: unavailable"),
    }
    println!("request timeout: {}s", effective.request_timeout_secs);
    println!("max attempts: {}", effective.max_attempts_before_fail);
    Ok(())
}

#[allow(clippy::needless_pass_by_value)]
pub fn apply_config_update(
    config: &mut CliConfig,
    mode: Option<ModeArg>,
    hosted_url: Option<String>,
    self_hosted_url: Option<String>,
    request_timeout_secs: Option<u64>,
    max_attempts: Option<u32>,
) -> Result<(), CliError> {
    if let Some(mode) = mode {
        config.mode = match mode {
            ModeArg::LocalOnly => ConnectivityMode::LocalOnly,
            ModeArg::Hosted => ConnectivityMode::Hosted,
            ModeArg::SelfHosted => ConnectivityMode::SelfHosted,
        };
    }
    if let Some(url) = hosted_url {
        config.hosted_url = normalize_server_url(url)?;
    }
    if let Some(url) = self_hosted_url {
        config.self_hosted_url = normalize_server_url(url)?;
    }
    if let Some(secs) = request_timeout_secs {
        if secs == 0 {
            return Err(CliError::Config(
                "request timeout must be at least one second".to_string(),
            ));
        }
        config.request_timeout_secs = Some(secs);
    }
    if let Some(attempts) = max_attempts {
        if attempts == 0 {
            return Err(CliError::Config(
                "max attempts must be at least 1".to_string(),
            ));
        }
        config.max_attempts_before_fail = Some(attempts);
    }
    Ok(())
}

/// An empty value clears the URL.
pub fn normalize_server_url(value: String) -> Result<Option<String>, CliError> {
    let Some(url) = normalize_text_option(Some(value)) else {
        return Ok(None);
    };
    if !is_http_url(&url) {
        return Err(CliError::Config(format!(
            "server URL must start with http:// or https:// (got '{url}')"
        )));
    }
    Ok(Some(url.trim_end_matches('/').to_string()))
}
