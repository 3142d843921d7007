//! Application configuration management.
//!
//! Configuration is stored at `~/.config/userportal/config.json` and can be
//! overridden from the environment:
//!
//! - `USERPORTAL_API_URL`: API base address
//! - `USERPORTAL_STORAGE`: `file` or `keyring`
//! - `USERPORTAL_EMAIL`: email to prefill in the login form

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::client::DEFAULT_TIMEOUT_SECS;
use crate::auth::{AuthCoordinator, FileRenewalStore, KeyringRenewalStore, RenewalStore};

/// Application name used for config/data directory paths
const APP_NAME: &str = "userportal";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_API_URL: &str = "https://user-registration-api-dl92.onrender.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// `session.json` in the data directory
    #[default]
    File,
    /// OS keychain
    Keyring,
}

impl StorageBackend {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Some(StorageBackend::File),
            "keyring" | "keychain" => Some(StorageBackend::Keyring),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub storage: StorageBackend,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            storage: StorageBackend::default(),
            last_email: None,
        }
    }
}

impl Config {
    /// Load the config file (defaults if absent), then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::read_file(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
        serde_json::from_str(&contents).context("Failed to parse config file")
    }

    /// Persist `last_email` to the config file at `path`. The rest of the
    /// file is left as it is on disk, so environment overrides never end up in it.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let mut on_disk = Self::read_file(path)?;
        on_disk.last_email = self.last_email.clone();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&on_disk)?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("USERPORTAL_API_URL").filter(|v| !v.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(value) = var("USERPORTAL_STORAGE") {
            match StorageBackend::parse(&value) {
                Some(backend) => self.storage = backend,
                None => warn!(value = %value, "Unknown USERPORTAL_STORAGE, keeping configured backend"),
            }
        }
        if let Some(email) = var("USERPORTAL_EMAIL").filter(|v| !v.is_empty()) {
            self.last_email = Some(email);
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Durable store for the refresh token, per `storage`
    pub fn renewal_store(&self) -> Result<Arc<dyn RenewalStore>> {
        Ok(match self.storage {
            StorageBackend::File => Arc::new(FileRenewalStore::new(self.data_dir()?)),
            StorageBackend::Keyring => Arc::new(KeyringRenewalStore),
        })
    }

    /// Wire up a coordinator for this configuration
    pub fn auth_coordinator(&self) -> Result<AuthCoordinator> {
        let store = self.renewal_store()?;
        AuthCoordinator::new(&self.api_base_url, self.request_timeout(), store)
            .context("Failed to create API client")
    }
}
