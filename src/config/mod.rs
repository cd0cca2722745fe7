use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Optional hex colour overrides for the lozenges, e.g. `success = "#36B37E"`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inprogress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the queue backend lives
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Repository base URL used for PR and pipeline links
    #[serde(default)]
    pub bitbucket_base_url: String,

    /// Seconds between queue refreshes, 0 disables
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Desktop notifications for CLI remove/cancel
    #[serde(default)]
    pub notifications: bool,

    /// Known author display names, keyed by account id
    #[serde(default)]
    pub users: HashMap<String, String>,

    #[serde(default)]
    pub theme: ThemeConfig,
}

fn default_server_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_refresh_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            bitbucket_base_url: String::new(),
            refresh_secs: default_refresh_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            notifications: false,
            users: HashMap::new(),
            theme: ThemeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("landq");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(AppConfig::default()),
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match Self::parse(&content) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read config: {}", e),
            }
            // Don't clobber a file the user is still editing
            return Ok(AppConfig::default());
        }

        let config = AppConfig::default();
        if let Err(e) = config.save() {
            tracing::warn!("Could not write default config: {}", e);
        }
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        let mut clean_config = self.clone();
        clean_config.server_url = clean_config.server_url.trim_end_matches('/').to_string();
        clean_config
            .users
            .retain(|aaid, name| !aaid.is_empty() && !name.is_empty());

        let content = toml::to_string_pretty(&clean_config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply command line overrides on top of the file
    pub fn with_overrides(mut self, server: Option<String>, bitbucket: Option<String>) -> Self {
        if let Some(server) = server {
            self.server_url = server;
        }
        if let Some(bitbucket) = bitbucket {
            self.bitbucket_base_url = bitbucket;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let mut users = HashMap::new();
        users.insert("557058:1234".to_string(), "Ada Lovelace".to_string());
        let config = AppConfig {
            server_url: "https://landkid.example.com".to_string(),
            bitbucket_base_url: "https://bitbucket.org/team/repo".to_string(),
            refresh_secs: 15,
            request_timeout_secs: 5,
            notifications: true,
            users,
            theme: ThemeConfig {
                success: Some("#36B37E".to_string()),
                ..Default::default()
            },
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized = AppConfig::parse(&serialized).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config =
            AppConfig::parse("bitbucket_base_url = \"https://bitbucket.org/a/b\"\n").unwrap();

        assert_eq!(config.server_url, "http://localhost:8080");
        assert_eq!(config.refresh_secs, 30);
        assert_eq!(config.request_timeout_secs, 10);
        assert!(config.users.is_empty());
        assert_eq!(config.bitbucket_base_url, "https://bitbucket.org/a/b");
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::default()
            .with_overrides(Some("http://queue:9000".to_string()), None);
        assert_eq!(config.server_url, "http://queue:9000");
        assert!(config.bitbucket_base_url.is_empty());
    }
}
