use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Token file name in cache directory
const SESSION_FILE: &str = "session.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Token storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("OS keychain error: {0}")]
    Keyring(#[from] ::keyring::Error),

    #[error("Could not find cache directory")]
    NoCacheDir,
}

/// Persistent home of the raw bearer token.
///
/// Implementations treat an empty stored string as no token.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Result<Option<String>, StoreError>;
    fn set(&self, token: &str) -> Result<(), StoreError>;
    /// Removing an absent token succeeds.
    fn remove(&self) -> Result<(), StoreError>;
}

pub(crate) fn non_empty(token: String) -> Option<String> {
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

// ============================================================================
// Memory
// ============================================================================

/// Token held in process memory only.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<String>, StoreError> {
        let token = self.token.lock().unwrap_or_else(|e| e.into_inner()).clone();
        Ok(token.and_then(non_empty))
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<(), StoreError> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

// ============================================================================
// File
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    saved_at: DateTime<Utc>,
}

/// Token persisted as JSON in the cache directory.
pub struct FileTokenStore {
    cache_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }

    /// When the current token was written, if there is one.
    pub fn saved_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.load()?.map(|stored| stored.saved_at))
    }

    fn load(&self) -> Result<Option<StoredToken>, StoreError> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        let stored: StoredToken = serde_json::from_str(&contents)?;
        Ok(Some(stored))
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.and_then(|stored| non_empty(stored.access_token)))
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        let path = self.path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let stored = StoredToken {
            access_token: token.to_string(),
            saved_at: Utc::now(),
        };
        std::fs::write(&path, serde_json::to_string_pretty(&stored)?)?;
        debug!(path = %path.display(), "Access token saved");
        Ok(())
    }

    fn remove(&self) -> Result<(), StoreError> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(&path)?;
            debug!(path = %path.display(), "Access token removed");
        }
        Ok(())
    }
}
