//! Authentication module for managing the persisted token and the session.
//!
//! This module provides:
//! - `TokenStore`: where the raw bearer token lives between runs
//!   (file, OS keychain, or memory)
//! - `SessionProvider`: the single owner of "who is logged in"
//!
//! The presence of a stored token is the only signal that a user may be
//! logged in; the in-memory session is rebuilt from it on startup.

pub mod keyring;
pub mod session;
pub mod store;

use std::sync::Arc;

use crate::config::{Config, TokenStorage};

pub use self::keyring::KeyringTokenStore;
pub use session::{AuthError, AuthState, Session, SessionProvider};
pub use store::{FileTokenStore, MemoryTokenStore, StoreError, TokenStore};

/// Open the token store selected in the configuration.
pub fn open_token_store(config: &Config) -> Result<Arc<dyn TokenStore>, StoreError> {
    let store: Arc<dyn TokenStore> = match config.token_storage {
        TokenStorage::File => {
            let cache_dir = Config::cache_dir().map_err(|_| StoreError::NoCacheDir)?;
            Arc::new(FileTokenStore::new(cache_dir))
        }
        TokenStorage::Keyring => Arc::new(KeyringTokenStore::new()),
    };
    Ok(store)
}
