//! Centralized path management for pve-user

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR: &str = "pve-user";

/// Get the pve-user config directory (not created, config is read-only)
pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join(APP_DIR))
}

/// Default location of the connection config file
pub fn default_config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Get the pve-user data directory
pub fn data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join(APP_DIR);

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory at {}", data_dir.display()))?;

    Ok(data_dir)
}

/// Get the API call log directory
pub fn api_logs_dir() -> Result<PathBuf> {
    let logs_dir = data_dir()?.join("api_logs");
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("creating api logs directory at {}", logs_dir.display()))?;
    Ok(logs_dir)
}
