use serde::Deserialize;
use sitewatch_common::MonitoredTarget;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_check_timeout_seconds")]
    pub check_timeout_seconds: u64,

    #[serde(default = "default_resync_interval_seconds")]
    pub resync_interval_seconds: u64,

    // Initial contents of the site store. Only read from the config file.
    #[serde(default)]
    pub sites: Vec<MonitoredTarget>,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    listen_address: Option<String>,
    log_dir: Option<String>,
    check_timeout_seconds: Option<u64>,
    resync_interval_seconds: Option<u64>,
    #[serde(default)]
    sites: Vec<MonitoredTarget>,
}

#[derive(Deserialize, Default, Debug)]
struct EnvServerConfig {
    listen_address: Option<String>,
    log_dir: Option<String>,
    check_timeout_seconds: Option<u64>,
    resync_interval_seconds: Option<u64>,
}

fn default_listen_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_check_timeout_seconds() -> u64 {
    10
}

fn default_resync_interval_seconds() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            log_dir: default_log_dir(),
            check_timeout_seconds: default_check_timeout_seconds(),
            resync_interval_seconds: default_resync_interval_seconds(),
            sites: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config = match config_path {
            Some(path_str) => Self::read_file(Path::new(path_str))?,
            None => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config: EnvServerConfig = envy::prefixed("SITEWATCH_")
            .from_env::<EnvServerConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        // 3. Merge: environment overrides file
        let final_config = ServerConfig {
            listen_address: env_config
                .listen_address
                .or(file_config.listen_address)
                .unwrap_or_else(default_listen_address),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            check_timeout_seconds: env_config
                .check_timeout_seconds
                .or(file_config.check_timeout_seconds)
                .unwrap_or_else(default_check_timeout_seconds),
            resync_interval_seconds: env_config
                .resync_interval_seconds
                .or(file_config.resync_interval_seconds)
                .unwrap_or_else(default_resync_interval_seconds),
            sites: file_config.sites,
        };

        final_config.validate()?;
        Ok(final_config)
    }

    fn read_file(path: &Path) -> Result<PartialServerConfig, String> {
        if !path.exists() {
            return Ok(PartialServerConfig::default());
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))
    }

    fn validate(&self) -> Result<(), String> {
        if self.check_timeout_seconds == 0 {
            return Err("check_timeout_seconds must be greater than zero".to_string());
        }
        if self.resync_interval_seconds == 0 {
            return Err("resync_interval_seconds must be greater than zero".to_string());
        }
        if let Some(site) = self.sites.iter().find(|s| s.interval == 0) {
            return Err(format!("Seed site {} has a zero interval", site.url));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file_with_seed_sites() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
check_timeout_seconds = 5

[[sites]]
url = "https://example.com"
interval = 30

[[sites]]
url = "https://example.org"
interval = 60
enabled = false
"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.check_timeout_seconds, 5);
        assert_eq!(config.sites.len(), 2);
        assert!(config.sites[0].enabled);
        assert!(!config.sites[1].enabled);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = ServerConfig::load(Some("/nonexistent/sitewatch.toml")).unwrap();
        assert_eq!(config.resync_interval_seconds, 300);
        assert!(config.sites.is_empty());
    }

    #[test]
    fn test_zero_interval_seed_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[[sites]]
url = "https://example.com"
interval = 0
"#
        )
        .unwrap();

        let err = ServerConfig::load(file.path().to_str()).unwrap_err();
        assert!(err.contains("zero interval"));
    }
}
