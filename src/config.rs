use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::network::DEFAULT_SPAM_API_URL;

pub const DEFAULT_CONFIG_PATH: &str = "config/echoroom.json";
pub const DEFAULT_DATABASE_PATH: &str = "data/echoroom.db";

pub const SPAM_API_URL_ENV: &str = "SPAM_DETECTION_API_URL";
pub const DATABASE_ENV: &str = "ECHOROOM_DATABASE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub spam_detection_api_url: String,
    pub database_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            spam_detection_api_url: DEFAULT_SPAM_API_URL.to_string(),
            database_path: DEFAULT_DATABASE_PATH.to_string(),
        }
    }
}

/// Values given on the command line. They beat every other source.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub spam_detection_api_url: Option<String>,
    pub database_path: Option<String>,
}

impl AppConfig {
    /// Layer environment values, then CLI overrides, on top of the file config.
    ///
    /// Blank environment values are ignored.
    pub fn merge<F>(mut self, env_lookup: F, overrides: ConfigOverrides) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_value = |key: &str| env_lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = overrides
            .spam_detection_api_url
            .or_else(|| env_value(SPAM_API_URL_ENV))
        {
            self.spam_detection_api_url = url;
        }
        if let Some(path) = overrides.database_path.or_else(|| env_value(DATABASE_ENV)) {
            self.database_path = path;
        }
        self
    }
}

/// Reads from the process environment, as populated by `dotenvy`.
pub fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}
