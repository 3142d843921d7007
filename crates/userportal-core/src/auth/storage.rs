//! Durable storage for the refresh token.
//!
//! Only the refresh token is ever written here. The access token lives in
//! `Session` memory and is re-derived from this value on start-up.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Keychain service name
const SERVICE_NAME: &str = "userportal";

/// Keychain account holding the refresh token
const KEYRING_ACCOUNT: &str = "refresh-token";

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

/// Synchronous key/value slot for the refresh token.
/// A missing value means there is no session to restore.
pub trait RenewalStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, refresh_token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    refresh_token: String,
    saved_at: DateTime<Utc>,
}

/// Stores the refresh token in `session.json` under the data directory
pub struct FileRenewalStore {
    dir: PathBuf,
}

impl FileRenewalStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }
}

impl RenewalStore for FileRenewalStore {
    fn load(&self) -> Result<Option<String>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let data: SessionFile =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(data.refresh_token))
    }

    fn save(&self, refresh_token: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).context("Failed to create data directory")?;
        let path = self.session_path();
        let data = SessionFile {
            refresh_token: refresh_token.to_string(),
            saved_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&data)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&path).context("Failed to open session file")?;

        // `mode` only applies on creation; tighten a file left by an older run
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .context("Failed to restrict session file permissions")?;
        }
        file.write_all(contents.as_bytes())
            .context("Failed to write session file")?;

        debug!(path = %path.display(), "Refresh token saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

/// Stores the refresh token in the OS keychain
pub struct KeyringRenewalStore;

impl KeyringRenewalStore {
    fn entry() -> Result<Entry> {
        Entry::new(SERVICE_NAME, KEYRING_ACCOUNT).context("Failed to create keyring entry")
    }
}

impl RenewalStore for KeyringRenewalStore {
    fn load(&self) -> Result<Option<String>> {
        match Self::entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve refresh token from keychain"),
        }
    }

    fn save(&self, refresh_token: &str) -> Result<()> {
        Self::entry()?
            .set_password(refresh_token)
            .context("Failed to store refresh token in keychain")
    }

    fn clear(&self) -> Result<()> {
        match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete refresh token from keychain"),
        }
    }
}

/// Process-local store, for tests and embedders that handle persistence themselves
#[derive(Default, Clone)]
pub struct MemoryRenewalStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryRenewalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(token.to_string()))),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RenewalStore for MemoryRenewalStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.lock().clone())
    }

    fn save(&self, refresh_token: &str) -> Result<()> {
        *self.lock() = Some(refresh_token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.lock() = None;
        Ok(())
    }
}
