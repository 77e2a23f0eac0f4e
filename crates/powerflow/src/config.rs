//! Merge the config file with global CLI overrides.
//!
//! Core never sees these flags: it receives a finished `CoordinatorConfig`.

use std::path::PathBuf;

use secrecy::SecretString;

use powerflow_config::Config;
use powerflow_core::CoordinatorConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The config file in effect: `--config` / `POWERFLOW_CONFIG`, else the
/// platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(powerflow_config::config_path)
}

/// Load the file and environment, then apply `--url` and `--insecure`.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = powerflow_config::load_config(Some(&config_file(global)))?;
    if let Some(url) = global.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        cfg.connection.url = Some(url.to_owned());
    }
    if global.insecure {
        cfg.connection.insecure = true;
    }
    Ok(cfg)
}

/// Build the coordinator configuration. `--token` replaces whatever the
/// credential chain resolved.
pub fn build_coordinator_config(global: &GlobalOpts) -> Result<CoordinatorConfig, CliError> {
    let mut config = load(global)?.to_coordinator_config()?;
    if let Some(token) = global
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        config.connection.token = Some(SecretString::from(token.to_owned()));
    }
    Ok(config)
}

/// Fail early with a pointer to the config file when the connection is
/// incomplete.
pub fn require_configured(config: &CoordinatorConfig, global: &GlobalOpts) -> Result<(), CliError> {
    if config.is_configured() {
        Ok(())
    } else {
        Err(CliError::NotConfigured {
            path: config_file(global).display().to_string(),
        })
    }
}
