//! Persistence for the access/refresh token pair.
//!
//! Two backends survive a restart: the OS keyring and a JSON file in the
//! cache directory whose entries carry their own expiry, the way browser
//! cookies do. Which one is used is a configuration choice.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::types::{TokenPair, TokenTtl};
use crate::config::{Config, TokenStorage};

const SERVICE_NAME: &str = "projdesk";

/// Storage key for the access token
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Token file name in cache directory
const TOKEN_FILE: &str = "tokens.json";

pub trait TokenStore: Send + Sync {
    /// Persist both tokens, replacing anything stored before.
    fn save(&self, pair: &TokenPair, ttl: TokenTtl) -> Result<()>;

    /// Load the stored pair. Returns `None` unless both tokens are present.
    fn load(&self) -> Result<Option<TokenPair>>;

    /// Overwrite the access token only; the refresh entry stays as it is.
    fn update_access(&self, access: &str, ttl: TokenTtl) -> Result<()>;

    /// Remove both tokens. Clearing an empty store is not an error.
    fn clear(&self) -> Result<()>;
}

/// Build the store selected by the configuration.
pub fn open_token_store(config: &Config) -> Result<Box<dyn TokenStore>> {
    match config.token_storage {
        TokenStorage::Keyring => Ok(Box::new(KeyringTokenStore::new()?)),
        TokenStorage::File => Ok(Box::new(FileTokenStore::new(config.cache_dir()?))),
    }
}

// ============================================================================
// Keyring
// ============================================================================

/// Tokens in the OS credential store, one entry per token.
pub struct KeyringTokenStore {
    access: Entry,
    refresh: Entry,
}

impl KeyringTokenStore {
    pub fn new() -> Result<Self> {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: &str) -> Result<Self> {
        let access =
            Entry::new(service, ACCESS_TOKEN_KEY).context("Failed to create keyring entry")?;
        let refresh =
            Entry::new(service, REFRESH_TOKEN_KEY).context("Failed to create keyring entry")?;
        Ok(Self::from_entries(access, refresh))
    }

    /// Build from existing entries, e.g. ones backed by a custom credential.
    pub fn from_entries(access: Entry, refresh: Entry) -> Self {
        Self { access, refresh }
    }

    fn read(entry: &Entry, key: &str) -> Result<Option<String>> {
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {} from keychain", key)),
        }
    }

    fn write(entry: &Entry, key: &str, value: &str) -> Result<()> {
        entry
            .set_password(value)
            .with_context(|| format!("Failed to store {} in keychain", key))
    }

    fn delete(entry: &Entry, key: &str) -> Result<()> {
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {} from keychain", key)),
        }
    }
}

impl TokenStore for KeyringTokenStore {
    fn save(&self, pair: &TokenPair, _ttl: TokenTtl) -> Result<()> {
        Self::write(&self.access, ACCESS_TOKEN_KEY, &pair.access)?;
        if let Err(e) = Self::write(&self.refresh, REFRESH_TOKEN_KEY, &pair.refresh) {
            // A new access token must not end up paired with an old refresh token.
            if let Err(cleanup) = self.clear() {
                warn!(error = %cleanup, "Failed to remove partially stored tokens");
            }
            return Err(e);
        }
        debug!("Token pair stored in keychain");
        Ok(())
    }

    fn load(&self) -> Result<Option<TokenPair>> {
        let access = Self::read(&self.access, ACCESS_TOKEN_KEY)?;
        let refresh = Self::read(&self.refresh, REFRESH_TOKEN_KEY)?;
        match (access, refresh) {
            (Some(access), Some(refresh)) => Ok(Some(TokenPair { access, refresh })),
            (None, None) => Ok(None),
            _ => {
                warn!("Only one token found in keychain, ignoring it");
                Ok(None)
            }
        }
    }

    fn update_access(&self, access: &str, _ttl: TokenTtl) -> Result<()> {
        Self::write(&self.access, ACCESS_TOKEN_KEY, access)
    }

    fn clear(&self) -> Result<()> {
        let access = Self::delete(&self.access, ACCESS_TOKEN_KEY);
        let refresh = Self::delete(&self.refresh, REFRESH_TOKEN_KEY);
        access.and(refresh)
    }
}

// ============================================================================
// File (cookie-like)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

impl StoredEntry {
    fn new(value: &str, ttl: chrono::Duration) -> Self {
        Self {
            value: value.to_string(),
            expires_at: Utc::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenFile {
    #[serde(rename = "accessToken", default)]
    access: Option<StoredEntry>,
    #[serde(rename = "refreshToken", default)]
    refresh: Option<StoredEntry>,
}

/// Tokens in a JSON file, each entry with its own expiry.
///
/// The access expiry is advisory and an expired access token is still
/// returned. A refresh entry past its expiry drops the whole pair.
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    fn read_file(&self) -> Result<Option<TokenFile>> {
        let path = self.token_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read token file")?;
        let file = serde_json::from_str(&contents).context("Failed to parse token file")?;
        Ok(Some(file))
    }

    fn write_file(&self, file: &TokenFile) -> Result<()> {
        std::fs::create_dir_all(&self.dir).context("Failed to create token directory")?;
        let contents = serde_json::to_string_pretty(file)?;
        write_private(&self.token_path(), contents.as_bytes())
    }
}

impl TokenStore for FileTokenStore {
    fn save(&self, pair: &TokenPair, ttl: TokenTtl) -> Result<()> {
        let file = TokenFile {
            access: Some(StoredEntry::new(&pair.access, ttl.access)),
            refresh: Some(StoredEntry::new(&pair.refresh, ttl.refresh)),
        };
        self.write_file(&file)?;
        debug!(path = %self.token_path().display(), "Token pair written");
        Ok(())
    }

    fn load(&self) -> Result<Option<TokenPair>> {
        let Some(file) = self.read_file()? else {
            return Ok(None);
        };

        let (Some(access), Some(refresh)) = (file.access, file.refresh) else {
            return Ok(None);
        };

        if refresh.is_expired() {
            info!(expired_at = %refresh.expires_at, "Stored refresh token expired, discarding tokens");
            self.clear()?;
            return Ok(None);
        }

        if access.is_expired() {
            debug!(expired_at = %access.expires_at, "Stored access token past its expiry");
        }

        Ok(Some(TokenPair {
            access: access.value,
            refresh: refresh.value,
        }))
    }

    fn update_access(&self, access: &str, ttl: TokenTtl) -> Result<()> {
        let mut file = self
            .read_file()?
            .filter(|f| f.refresh.is_some())
            .ok_or_else(|| anyhow::anyhow!("No stored refresh token to pair the access token with"))?;
        file.access = Some(StoredEntry::new(access, ttl.access));
        self.write_file(&file)
    }

    fn clear(&self) -> Result<()> {
        let path = self.token_path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove token file")?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .context("Failed to open token file")?;
    // mode() only applies on creation
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(contents).context("Failed to write token file")?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    std::fs::write(path, contents).context("Failed to write token file")
}

// ============================================================================
// Memory
// ============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    access: Option<String>,
    refresh: Option<String>,
    writes: usize,
}

/// Process-local store. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: TokenPair) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.lock() {
            state.access = Some(pair.access);
            state.refresh = Some(pair.refresh);
        }
        store
    }

    /// Number of mutating calls (save, update_access, clear) seen so far.
    pub fn write_count(&self) -> usize {
        self.state.lock().map(|s| s.writes).unwrap_or(0)
    }

    /// Raw entries, including a lone token that `load` would not return.
    pub fn entries(&self) -> (Option<String>, Option<String>) {
        self.state
            .lock()
            .map(|s| (s.access.clone(), s.refresh.clone()))
            .unwrap_or((None, None))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow::anyhow!("Token store lock poisoned"))
    }
}

impl TokenStore for MemoryTokenStore {
    fn save(&self, pair: &TokenPair, _ttl: TokenTtl) -> Result<()> {
        let mut state = self.lock()?;
        state.access = Some(pair.access.clone());
        state.refresh = Some(pair.refresh.clone());
        state.writes += 1;
        Ok(())
    }

    fn load(&self) -> Result<Option<TokenPair>> {
        let state = self.lock()?;
        Ok(match (&state.access, &state.refresh) {
            (Some(access), Some(refresh)) => Some(TokenPair::new(access.clone(), refresh.clone())),
            _ => None,
        })
    }

    fn update_access(&self, access: &str, _ttl: TokenTtl) -> Result<()> {
        let mut state = self.lock()?;
        state.access = Some(access.to_string());
        state.writes += 1;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.access = None;
        state.refresh = None;
        state.writes += 1;
        Ok(())
    }
}
