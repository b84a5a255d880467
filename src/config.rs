use crate::fetcher::{ImageParams, IMAGE_ENDPOINT};
use crate::prompt::backend::{DEFAULT_TEXT_MODELS, TEXT_ENDPOINT};
use crate::sources::Location;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub tick_interval_secs: u64,
    pub max_retries: u32,
    pub text_endpoint: String,
    pub text_models: Vec<String>,
    pub image_endpoint: String,
    pub image: ImageParams,
    pub location: LocationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 9000,
            tick_interval_secs: 60,
            max_retries: 3,
            text_endpoint: TEXT_ENDPOINT.to_string(),
            text_models: DEFAULT_TEXT_MODELS.iter().map(|m| m.to_string()).collect(),
            image_endpoint: IMAGE_ENDPOINT.to_string(),
            image: ImageParams::default(),
            location: LocationConfig::default(),
        }
    }
}

/// Body of `GET|POST /api/location-config`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LocationConfig {
    pub auto_location: bool,
    pub manual_location: Location,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            auto_location: true,
            manual_location: Location::default(),
        }
    }
}

impl LocationConfig {
    /// Rejects anything that is not an object with a boolean `auto_location`
    /// and a `manual_location` object of strings.
    pub fn from_json(body: &[u8]) -> Result<Self, ConfigError> {
        Ok(serde_json::from_slice(body)?)
    }
}

pub fn config_path(app_data_dir: &Path) -> PathBuf {
    app_data_dir.join(CONFIG_FILE)
}

/// Loads `config.json`, writing the defaults out when it does not exist yet.
pub fn load_or_init(app_data_dir: &Path) -> Result<Config, ConfigError> {
    let path = config_path(app_data_dir);
    if !path.exists() {
        info!("[config] no {} found, writing defaults", path.display());
        let config = Config::default();
        save(app_data_dir, &config)?;
        return Ok(config);
    }
    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    match serde_json::from_str(&text) {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!("[config] {} is malformed ({}), using defaults", path.display(), e);
            Ok(Config::default())
        }
    }
}

pub fn save(app_data_dir: &Path, config: &Config) -> Result<(), ConfigError> {
    let path = config_path(app_data_dir);
    let text = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, text).map_err(|source| ConfigError::Write { path, source })
}
