use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::editor::EditPolicy;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PanelConfig {
    pub server_url: String,
    pub enable_on_interval_edit: bool,
    pub request_timeout_seconds: u64,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialPanelConfig {
    server_url: Option<String>,
    enable_on_interval_edit: Option<bool>,
    request_timeout_seconds: Option<u64>,
}

fn default_server_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            enable_on_interval_edit: false,
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl PanelConfig {
    /// File first, then `SITEWATCH_PANEL_*` environment variables on top.
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        let file_config = match config_path {
            Some(path_str) => read_file(Path::new(path_str))?,
            None => PartialPanelConfig::default(),
        };

        let env_config: PartialPanelConfig = envy::prefixed("SITEWATCH_PANEL_")
            .from_env()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        Ok(Self::merge(env_config, file_config))
    }

    fn merge(env_config: PartialPanelConfig, file_config: PartialPanelConfig) -> Self {
        PanelConfig {
            server_url: env_config
                .server_url
                .or(file_config.server_url)
                .unwrap_or_else(default_server_url),
            enable_on_interval_edit: env_config
                .enable_on_interval_edit
                .or(file_config.enable_on_interval_edit)
                .unwrap_or(false),
            request_timeout_seconds: env_config
                .request_timeout_seconds
                .or(file_config.request_timeout_seconds)
                .unwrap_or_else(default_request_timeout_seconds),
        }
    }

    pub fn policy(&self) -> EditPolicy {
        EditPolicy {
            enable_on_interval_edit: self.enable_on_interval_edit,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.max(1))
    }
}

fn read_file(path: &Path) -> Result<PartialPanelConfig, String> {
    if !path.exists() {
        return Ok(PartialPanelConfig::default());
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
    toml::from_str(&contents)
        .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))
}
