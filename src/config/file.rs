// src/config/file.rs

use crate::{
    config::ExternalConfig,
    constants,
    error::{AppError, AppResult},
};
use anyhow::{Context, anyhow};
use log::{debug, info};
use std::{fs, path::PathBuf};

pub fn config_dir() -> AppResult<PathBuf> {
    Ok(dirs::home_dir()
        .ok_or_else(|| AppError::Other(anyhow!("Cannot locate the home directory")))?
        .join(constants::CONFIG_DIR_NAME))
}

pub(super) fn get_config_path() -> AppResult<PathBuf> {
    Ok(config_dir()?.join(constants::CONFIG_FILE_NAME))
}

pub(crate) fn load_or_create_external_config() -> AppResult<ExternalConfig> {
    let config_path = get_config_path()?;
    if config_path.is_file() {
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file '{}'", config_path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", config_path.display()))
            .map_err(AppError::from)
    } else {
        info!("Config file {:?} not found, writing defaults", config_path);
        let config = ExternalConfig::default_app_config();

        if let Some(dir) = config_path.parent() {
            fs::create_dir_all(dir)?;
        }

        let json_content = serde_json::to_string_pretty(&config)?;
        fs::write(&config_path, json_content)?;

        Ok(config)
    }
}

/// Picks the owner id: CLI flag, then `OWNER_ID`, then the config file.
pub fn resolve_owner(cli_owner: Option<i64>, external: &ExternalConfig) -> (Option<i64>, String) {
    if let Some(id) = cli_owner {
        debug!("Owner id taken from the command line");
        return (Some(id), "command line".to_string());
    }
    if let Ok(raw) = std::env::var("OWNER_ID")
        && let Ok(id) = raw.trim().parse::<i64>()
    {
        debug!("Owner id taken from OWNER_ID");
        return (Some(id), "environment (OWNER_ID)".to_string());
    }
    if let Some(id) = external.owner_id {
        debug!("Owner id taken from the config file");
        return (Some(id), "config file".to_string());
    }
    (None, "nowhere (every user allowed)".to_string())
}
