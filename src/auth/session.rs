use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Session file name in the storage directory
const SESSION_FILE: &str = "session.json";

/// Opaque bearer credential for the LearnHub API.
///
/// The token contents are never inspected client-side; expiry is discovered
/// by the server rejecting a request, at which point `SessionClient`
/// refreshes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    pub obtained_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: String) -> Self {
        Self {
            token,
            obtained_at: Utc::now(),
        }
    }
}

/// Holder of the current credential, persisted under a well-known file.
///
/// Lifecycle: `load()` at app start, `set()` on login/refresh success,
/// `clear()` on logout or irrecoverable auth failure.
pub struct SessionStore {
    storage_dir: PathBuf,
    credential: Option<Credential>,
}

impl SessionStore {
    pub fn new(storage_dir: PathBuf) -> Self {
        Self {
            storage_dir,
            credential: None,
        }
    }

    /// Load a persisted credential from disk. Returns true if one was found.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(false);
        }
        let contents = std::fs::read_to_string(&path)
            .context("Failed to read session file")?;
        let credential: Credential = serde_json::from_str(&contents)
            .context("Failed to parse session file")?;
        self.credential = Some(credential);
        Ok(true)
    }

    /// Replace the current credential and persist it.
    pub fn set(&mut self, credential: Credential) -> Result<()> {
        self.credential = Some(credential);
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(ref credential) = self.credential {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(credential)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Drop the credential and remove the persisted copy.
    pub fn clear(&mut self) -> Result<()> {
        self.credential = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(&path)?;
            debug!(path = %path.display(), "Removed persisted session");
        }
        Ok(())
    }

    /// Get the bearer token if a credential is present.
    pub fn token(&self) -> Option<String> {
        self.credential.as_ref().map(|c| c.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    fn session_path(&self) -> PathBuf {
        self.storage_dir.join(SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut store = SessionStore::new(dir.path().to_path_buf());
        store.set(Credential::new("tok-123".to_string())).unwrap();

        let mut reloaded = SessionStore::new(dir.path().to_path_buf());
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.token().as_deref(), Some("tok-123"));
    }

    #[test]
    fn test_clear_removes_persisted_session() {
        let dir = TempDir::new().unwrap();
        let mut store = SessionStore::new(dir.path().to_path_buf());
        store.set(Credential::new("tok-123".to_string())).unwrap();
        store.clear().unwrap();

        assert!(!store.is_authenticated());
        let mut reloaded = SessionStore::new(dir.path().to_path_buf());
        assert!(!reloaded.load().unwrap());
    }

    #[test]
    fn test_load_without_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let mut store = SessionStore::new(dir.path().to_path_buf());
        assert!(!store.load().unwrap());
        assert!(store.token().is_none());
    }
}
