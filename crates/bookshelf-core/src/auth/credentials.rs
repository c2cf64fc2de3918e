//! Durable mirror of the bearer token and cached profile.
//!
//! The session manager is the only writer. Every backend stores the token
//! and the profile as one record, so a reader never sees one without the
//! other. Unreadable data is reported as "no record".

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::Profile;

/// Credentials file name in the cache directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// Keychain service name
const SERVICE_NAME: &str = "bookshelf";

/// Keychain account the record is stored under
const KEYRING_ACCOUNT: &str = "session";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub access_token: String,
    /// Absent when only the token survived (profile never cached or
    /// dropped). Writers always fill it.
    #[serde(default)]
    pub user: Option<Profile>,
}

pub trait CredentialStore: Send + Sync {
    /// Persist token and profile together.
    fn save(&self, token: &str, user: &Profile) -> Result<()>;

    /// Read the persisted record; malformed or missing data yields `None`.
    fn load(&self) -> Option<CredentialRecord>;

    /// Remove any persisted record. Clearing an empty store succeeds.
    fn clear(&self) -> Result<()>;
}

fn parse_record(contents: &str, source: &str) -> Option<CredentialRecord> {
    match serde_json::from_str::<CredentialRecord>(contents) {
        Ok(record) if !record.access_token.is_empty() => Some(record),
        Ok(_) => {
            warn!(source, "Stored credentials have an empty token, ignoring");
            None
        }
        Err(e) => {
            warn!(source, error = %e, "Stored credentials are malformed, ignoring");
            None
        }
    }
}

// ============================================================================
// File store
// ============================================================================

/// JSON file in the cache directory, replaced atomically on every save.
pub struct FileCredentialStore {
    cache_dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn credentials_path(&self) -> PathBuf {
        self.cache_dir.join(CREDENTIALS_FILE)
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, token: &str, user: &Profile) -> Result<()> {
        std::fs::create_dir_all(&self.cache_dir)
            .context("Failed to create credentials directory")?;

        let record = CredentialRecord {
            access_token: token.to_string(),
            user: Some(user.clone()),
        };
        let contents = serde_json::to_string_pretty(&record)?;

        // Write-then-rename so a crash never leaves half a record behind
        let path = self.credentials_path();
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).context("Failed to write credentials file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }
        std::fs::rename(&tmp, &path).context("Failed to replace credentials file")?;

        debug!(path = ?path, "Credentials saved");
        Ok(())
    }

    fn load(&self) -> Option<CredentialRecord> {
        let path = self.credentials_path();
        let contents = std::fs::read_to_string(&path).ok()?;
        parse_record(&contents, "file")
    }

    fn clear(&self) -> Result<()> {
        let path = self.credentials_path();
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = ?path, "Credentials removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove credentials file"),
        }
    }
}

// ============================================================================
// Keyring store
// ============================================================================

/// OS keychain entry holding the serialized record.
pub struct KeyringCredentialStore {
    account: String,
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self {
            account: KEYRING_ACCOUNT.to_string(),
        }
    }

    /// Use a separate keychain account, e.g. one per backend URL.
    pub fn with_account(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn save(&self, token: &str, user: &Profile) -> Result<()> {
        let record = CredentialRecord {
            access_token: token.to_string(),
            user: Some(user.clone()),
        };
        let contents = serde_json::to_string(&record)?;
        self.entry()?
            .set_password(&contents)
            .context("Failed to store credentials in keychain")?;
        Ok(())
    }

    fn load(&self) -> Option<CredentialRecord> {
        let contents = self.entry().ok()?.get_password().ok()?;
        parse_record(&contents, "keyring")
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credentials from keychain"),
        }
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryCredentialStore {
    record: Mutex<Option<CredentialRecord>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing record, as if it had been persisted earlier.
    pub fn with_record(record: CredentialRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, token: &str, user: &Profile) -> Result<()> {
        let mut slot = self.record.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(CredentialRecord {
            access_token: token.to_string(),
            user: Some(user.clone()),
        });
        Ok(())
    }

    fn load(&self) -> Option<CredentialRecord> {
        self.record
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn clear(&self) -> Result<()> {
        *self.record.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
