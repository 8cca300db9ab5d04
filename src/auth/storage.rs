//! Persisted session identity.

use super::Session;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage key for the bearer token.
pub const TOKEN_KEY: &str = "godo_token";
/// Storage key for the logged-in username.
pub const USER_KEY: &str = "godo_user";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt session file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage file format: a flat string map, like browser local storage.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(flatten)]
    entries: BTreeMap<String, String>,
}

/// File-backed session store.
///
/// Never touches the network. Whether a stored token is still valid is only
/// discovered when a request using it is rejected.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store at an explicit path. The file is created lazily on first write.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back a previously saved session. Both token and username must be present.
    pub fn restore(&self) -> Result<Option<Session>, StoreError> {
        let file = self.read_file()?;
        let token = non_empty(file.entries.get(TOKEN_KEY));
        let username = non_empty(file.entries.get(USER_KEY));
        Ok(match (token, username) {
            (Some(token), Some(username)) => Some(Session {
                username: username.to_string(),
                token: token.to_string(),
            }),
            _ => None,
        })
    }

    pub fn save(&self, session: &Session) -> Result<(), StoreError> {
        let mut file = self.read_file()?;
        file.entries
            .insert(TOKEN_KEY.to_string(), session.token.clone());
        file.entries
            .insert(USER_KEY.to_string(), session.username.clone());
        self.write_file(&file)
    }

    /// Erase all persisted identity. Clearing an absent store is a no-op.
    ///
    /// An unreadable file is removed outright.
    pub fn clear(&self) -> Result<(), StoreError> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut file = match self.read_file() {
            Ok(file) => file,
            Err(StoreError::Json(e)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "Removing corrupt session file: {e}"
                );
                fs::remove_file(&self.path)?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let had_token = file.entries.remove(TOKEN_KEY).is_some();
        let had_user = file.entries.remove(USER_KEY).is_some();
        if had_token || had_user {
            self.write_file(&file)?;
        }
        Ok(())
    }

    pub fn load_token(&self) -> Result<Option<String>, StoreError> {
        let file = self.read_file()?;
        Ok(non_empty(file.entries.get(TOKEN_KEY)).map(str::to_string))
    }

    pub fn save_token(&self, token: &str) -> Result<(), StoreError> {
        let mut file = self.read_file()?;
        file.entries.insert(TOKEN_KEY.to_string(), token.to_string());
        self.write_file(&file)
    }

    fn read_file(&self) -> Result<SessionFile, StoreError> {
        if !self.path.exists() {
            return Ok(SessionFile::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(SessionFile::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_file(&self, file: &SessionFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(file)?;
        fs::write(&self.path, content)?;

        // Set restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}
