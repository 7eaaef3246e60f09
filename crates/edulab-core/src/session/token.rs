//! Session token persistence.
//!
//! A single opaque token is kept under one well-known file in the platform
//! config directory. Durability across restarts is intentionally not
//! guaranteed: [`SessionStore::initialize`](super::SessionStore::initialize)
//! clears the token on every process start.

use crate::error::{EdulabError, Result};
use std::fs;
use std::path::PathBuf;

/// Storage for the persisted session token.
pub trait TokenStore: Send + Sync {
    /// Returns the stored token, or `None` when no token is persisted.
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    /// Removes the stored token. Clearing an absent token is not an error.
    fn clear(&self) -> Result<()>;
}

/// File-backed token store at `~/.config/edulab/session_token`.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Creates a store at the default platform config path.
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| EdulabError::config("Could not determine config directory"))?;
        Ok(Self {
            path: config_dir.join("edulab").join("session_token"),
        })
    }

    /// Creates a store at a custom path (for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let token = fs::read_to_string(&self.path)?;
        let token = token.trim();
        if token.is_empty() {
            Ok(None)
        } else {
            Ok(Some(token.to_string()))
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
