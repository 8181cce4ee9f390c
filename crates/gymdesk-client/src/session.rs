//! Durable session storage.
//!
//! The session is one JSON document holding the access token, the refresh
//! token, and the current user, stored at
//! `~/.local/share/gymdesk/session.json`. The three values travel together:
//! a save writes all of them and a clear removes all of them, so callers
//! never observe a session with some keys missing.
//!
//! Writes go through a temp file and rename, and read-modify-write cycles
//! take an advisory lock on a sibling lock file, so concurrent gymdesk
//! processes cannot interleave a token rotation. Beyond that the store is
//! last-writer-wins.

use std::fs;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::PathBuf;
use std::sync::Mutex;

use fs2::FileExt as _;
use gymdesk_common::User;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// The persisted session: tokens plus the user they belong to.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    /// Short-lived bearer credential.
    pub access_token: String,
    /// Credential for obtaining a new access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// The authenticated user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user: Option<User>,
}

// Tokens must not leak through debug logs.
impl std::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("current_user", &self.current_user)
            .finish()
    }
}

/// Storage backend for the session document.
///
/// The trait is narrow on purpose: the transport and the session manager
/// only ever read the whole session, replace it, rotate its tokens, or
/// clear it.
pub trait SessionStore: Send + Sync {
    /// Read the stored session, if any.
    ///
    /// A corrupt document reads as "no session" so callers that only need a
    /// yes/no answer never have to handle a parse failure.
    fn load(&self) -> Result<Option<StoredSession>>;

    /// Replace the stored session.
    fn save(&self, session: &StoredSession) -> Result<()>;

    /// Rotate tokens in place, keeping the stored user.
    ///
    /// `refresh_token` of `None` keeps the previous refresh token; the
    /// refresh endpoint does not always rotate it.
    fn update_tokens(&self, access_token: &str, refresh_token: Option<&str>) -> Result<()>;

    /// Remove the stored session entirely.
    fn clear(&self) -> Result<()>;

    /// Convenience: the stored access token, if any.
    fn access_token(&self) -> Result<Option<String>> {
        Ok(self.load()?.map(|session| session.access_token))
    }

    /// Convenience: the stored refresh token, if any.
    fn refresh_token(&self) -> Result<Option<String>> {
        Ok(self.load()?.and_then(|session| session.refresh_token))
    }
}

/// File-backed store under the platform data directory.
pub struct FileSessionStore {
    session_file: PathBuf,
    lock_file: PathBuf,
}

impl FileSessionStore {
    /// Create a store at the default location, creating the data directory
    /// with owner-only permissions if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined or
    /// created.
    pub fn new() -> Result<Self> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| ApiError::Storage("Failed to determine data directory".to_string()))?
            .join("gymdesk");
        Self::at(data_dir)
    }

    /// Create a store rooted at a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn at(data_dir: PathBuf) -> Result<Self> {
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(&data_dir)
            .map_err(|e| ApiError::Storage(format!("Failed to create data directory: {e}")))?;

        // Harden existing installs: sessions are secrets.
        fs::set_permissions(&data_dir, fs::Permissions::from_mode(0o700))
            .map_err(|e| ApiError::Storage(format!("Failed to set directory permissions: {e}")))?;

        Ok(Self {
            session_file: data_dir.join("session.json"),
            lock_file: data_dir.join("session.lock"),
        })
    }

    /// Take the advisory write lock; released when the handle drops.
    fn lock(&self) -> Result<fs::File> {
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .mode(0o600)
            .open(&self.lock_file)
            .map_err(|e| ApiError::Storage(format!("Failed to open lock file: {e}")))?;
        file.lock_exclusive()
            .map_err(|e| ApiError::Storage(format!("Failed to lock session store: {e}")))?;
        Ok(file)
    }

    fn read_unlocked(&self) -> Result<Option<StoredSession>> {
        let contents = match fs::read_to_string(&self.session_file) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ApiError::Storage(format!("Failed to read session: {e}"))),
        };

        match serde_json::from_str(&contents) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("stored session is unreadable, treating as signed out: {e}");
                Ok(None)
            }
        }
    }

    fn write_unlocked(&self, session: &StoredSession) -> Result<()> {
        let tmp = self.session_file.with_extension("json.tmp");
        let contents = serde_json::to_vec_pretty(session)?;
        fs::write(&tmp, contents)
            .map_err(|e| ApiError::Storage(format!("Failed to write session: {e}")))?;
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))
            .map_err(|e| ApiError::Storage(format!("Failed to set session permissions: {e}")))?;
        fs::rename(&tmp, &self.session_file)
            .map_err(|e| ApiError::Storage(format!("Failed to replace session: {e}")))?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        let _guard = self.lock()?;
        self.read_unlocked()
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        let _guard = self.lock()?;
        self.write_unlocked(session)
    }

    fn update_tokens(&self, access_token: &str, refresh_token: Option<&str>) -> Result<()> {
        let _guard = self.lock()?;
        let previous = self.read_unlocked()?;
        let session = StoredSession {
            access_token: access_token.to_string(),
            refresh_token: refresh_token
                .map(String::from)
                .or_else(|| previous.as_ref().and_then(|s| s.refresh_token.clone())),
            current_user: previous.and_then(|s| s.current_user),
        };
        self.write_unlocked(&session)
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.lock()?;
        match fs::remove_file(&self.session_file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::Storage(format!("Failed to clear session: {e}"))),
        }
    }
}

/// In-memory store, for tests and embedders that manage persistence
/// themselves.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<StoredSession>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding a session.
    #[must_use]
    pub fn with_session(session: StoredSession) -> Self {
        Self {
            inner: Mutex::new(Some(session)),
        }
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, Option<StoredSession>>> {
        self.inner
            .lock()
            .map_err(|_| ApiError::Storage("Session store poisoned".to_string()))
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        Ok(self.guard()?.clone())
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        *self.guard()? = Some(session.clone());
        Ok(())
    }

    fn update_tokens(&self, access_token: &str, refresh_token: Option<&str>) -> Result<()> {
        let mut guard = self.guard()?;
        let previous = guard.take();
        *guard = Some(StoredSession {
            access_token: access_token.to_string(),
            refresh_token: refresh_token
                .map(String::from)
                .or_else(|| previous.as_ref().and_then(|s| s.refresh_token.clone())),
            current_user: previous.and_then(|s| s.current_user),
        });
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.guard()? = None;
        Ok(())
    }
}
