//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::storage::database::default_database_path;

/// Portfolio configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub directory: DirectoryConfig,
    pub database: DatabaseSection,
}

/// Member directory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Base URL of the member directory API; empty uses the built-in roster
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory: DirectoryConfig {
                base_url: String::new(),
                timeout_secs: 10,
            },
            database: DatabaseSection {
                path: default_database_path(),
            },
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("PORTFOLIO_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("portfolio")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or create default if it doesn't exist
    ///
    /// `PORTFOLIO_DIRECTORY_URL` and `PORTFOLIO_DB_PATH` override the
    /// file's values.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        let mut config = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Config::default()
        };

        if let Ok(url) = env::var("PORTFOLIO_DIRECTORY_URL") {
            config.directory.base_url = url;
        }
        if let Ok(db_path) = env::var("PORTFOLIO_DB_PATH") {
            config.database.path = PathBuf::from(db_path);
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "directory.base_url" => Ok(self.directory.base_url.clone()),
            "directory.timeout_secs" => Ok(self.directory.timeout_secs.to_string()),
            "database.path" => Ok(self.database.path.display().to_string()),
            _ => Err(anyhow!("Unknown configuration key: {key}")),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "directory.base_url" => {
                self.directory.base_url = value.to_string();
            }
            "directory.timeout_secs" => {
                self.directory.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {value}"))?;
            }
            "database.path" => {
                self.database.path = PathBuf::from(value);
            }
            _ => {
                return Err(anyhow!("Unknown configuration key: {key}"));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        ["directory.base_url", "directory.timeout_secs", "database.path"]
            .into_iter()
            .map(|key| Ok((key.to_string(), self.get(key)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).expect("serialize");
        let parsed: Config = toml::from_str(&serialized).expect("parse");
        assert_eq!(parsed.directory.base_url, config.directory.base_url);
        assert_eq!(parsed.directory.timeout_secs, 10);
        assert_eq!(parsed.database.path, config.database.path);
    }

    #[test]
    fn test_get_and_set_by_key() {
        let mut config = Config::default();
        config
            .set("directory.base_url", "http://directory.internal:8080")
            .expect("set");
        assert_eq!(
            config.get("directory.base_url").expect("get"),
            "http://directory.internal:8080"
        );

        config.set("directory.timeout_secs", "30").expect("set");
        assert_eq!(config.directory.timeout_secs, 30);

        assert!(config.set("directory.timeout_secs", "abc").is_err());
        assert!(config.get("nope").is_err());
        assert!(config.set("nope", "x").is_err());
    }
}
