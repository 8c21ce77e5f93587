//! Application configuration management.
//!
//! This module handles loading and saving the user configuration: the
//! backend URL, where the session is kept, and the last email used to log
//! in. Configuration is stored at `~/.config/docchat/config.json`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_API_URL;
use crate::auth::{CredentialStore, FileStore, KeyValueStore, KeyringStore, MemoryStore};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "docchat";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Environment variable that overrides the configured backend URL
pub const API_URL_ENV_VAR: &str = "DOCCHAT_API_URL";

/// Where the session token and user record are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
    /// Nothing persists past the current process.
    Memory,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageBackend::File => "file",
            StorageBackend::Keyring => "keyring",
            StorageBackend::Memory => "memory",
        };
        f.write_str(name)
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "keyring" => Ok(StorageBackend::Keyring),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("Unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_url: Option<String>,
    #[serde(default)]
    pub storage: StorageBackend,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not find config directory")?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir().context("Could not find cache directory")?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Backend URL: environment override, then config file, then default.
    pub fn api_url(&self) -> String {
        self.resolve_api_url(std::env::var(API_URL_ENV_VAR).ok())
    }

    fn resolve_api_url(&self, env_override: Option<String>) -> String {
        env_override
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Build the credential store for the configured backend.
    pub fn credential_store(&self) -> Result<CredentialStore> {
        let backend: Box<dyn KeyValueStore> = match self.storage {
            StorageBackend::File => Box::new(FileStore::new(self.cache_dir()?.join(SESSION_FILE))),
            StorageBackend::Keyring => Box::new(KeyringStore::new()),
            StorageBackend::Memory => Box::new(MemoryStore::new()),
        };
        Ok(CredentialStore::from_boxed(backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_precedence() {
        let mut config = Config::default();
        assert_eq!(config.resolve_api_url(None), DEFAULT_API_URL);

        config.api_url = Some("https://chat.example.com".to_string());
        assert_eq!(config.resolve_api_url(None), "https://chat.example.com");
        assert_eq!(
            config.resolve_api_url(Some("http://localhost:8080".to_string())),
            "http://localhost:8080"
        );
        assert_eq!(config.resolve_api_url(Some(" ".to_string())), "https://chat.example.com");
    }

    #[test]
    fn test_config_defaults_missing_fields() {
        let config: Config = serde_json::from_str(r#"{"api_url": null}"#).unwrap();
        assert_eq!(config.storage, StorageBackend::File);
        assert!(config.last_email.is_none());
    }

    #[test]
    fn test_load_and_save_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        assert_eq!(Config::load_from(&path).unwrap().storage, StorageBackend::File);

        let config = Config {
            storage: StorageBackend::Keyring,
            last_email: Some("alice@example.com".to_string()),
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.storage, StorageBackend::Keyring);
        assert_eq!(loaded.last_email.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn test_corrupt_config_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Failed to parse config file"));
        assert!(message.contains(&path.display().to_string()));
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!("Keyring".parse::<StorageBackend>(), Ok(StorageBackend::Keyring));
        assert_eq!(StorageBackend::Memory.to_string(), "memory");
        assert!("redis".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_memory_credential_store() {
        let config = Config {
            storage: StorageBackend::Memory,
            ..Default::default()
        };
        let store = config.credential_store().unwrap();
        assert!(store.load().is_none());
    }
}
