//! Plugin configuration
//!
//! Default session parameters applied to start requests that omit them, and
//! the log level. Persisted as JSON next to the host application's settings.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LocationError, Result};
use crate::location::SessionConfig;

pub const CONFIG_FILE_NAME: &str = "location-config.json";

/// Plugin configuration (persisted)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    #[serde(default)]
    pub defaults: SessionConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            defaults: SessionConfig::default(),
            log_level: default_log_level(),
        }
    }
}

/// Get the default path to the plugin config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push("location-bridge");
        path.push(CONFIG_FILE_NAME);
        path
    })
}

/// Load plugin config from file
pub fn load_config_from_file(path: &Path) -> Option<PluginConfig> {
    if !path.exists() {
        log::info!("No location config file found at {:?}", path);
        return None;
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(config) => {
                log::info!("Loaded location config from {:?}", path);
                Some(config)
            }
            Err(e) => {
                log::error!("Failed to parse location config file: {}", e);
                None
            }
        },
        Err(e) => {
            log::error!("Failed to read location config file: {}", e);
            None
        }
    }
}

/// Save plugin config to file
pub fn save_config(path: &Path, config: &PluginConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            LocationError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }

    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content)
        .map_err(|e| LocationError::Config(format!("Failed to write config file: {}", e)))?;

    log::info!("[CONFIG] location config saved to {:?}", path);
    Ok(())
}

/// Load the config at `path`, falling back to defaults
pub fn load_or_default(path: Option<&Path>) -> PluginConfig {
    path.and_then(load_config_from_file).unwrap_or_default()
}
