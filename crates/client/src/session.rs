//! Session state and persistence.
//!
//! The session is the bearer token plus the logged-in user. It lives in a
//! [`SessionHandle`] shared by the API client (as its [`TokenProvider`]) and
//! the route guard, and is mirrored to a [`SessionStore`] so it survives
//! restarts.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use marketplace_core::models::User;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::TokenProvider;
use crate::error::Result;

/// On-disk form of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
}

/// Point-in-time view of the session.
#[derive(Debug, Default)]
pub struct Session {
    pub token: Option<SecretString>,
    pub user: Option<User>,
}

impl Session {
    /// Whether a token is present.
    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

// =============================================================================
// Storage
// =============================================================================

/// Where sessions are persisted.
pub trait SessionStore: Send + Sync {
    /// Read the stored session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn load(&self) -> Result<Option<StoredSession>>;

    /// Replace the stored session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written.
    fn save(&self, session: &StoredSession) -> Result<()>;

    /// Remove the stored session. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written.
    fn clear(&self) -> Result<()>;
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&contents) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                // A corrupt file is treated as logged out
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<StoredSession>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_session(session: StoredSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        Ok(self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

// =============================================================================
// SessionHandle
// =============================================================================

/// Shared, persisted session.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    state: RwLock<Option<StoredSession>>,
    store: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    /// Create a handle backed by `store`, starting logged out.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                state: RwLock::new(None),
                store,
            }),
        }
    }

    /// Create a handle and load any persisted session.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn restore(store: Arc<dyn SessionStore>) -> Result<Self> {
        let stored = store.load()?;
        if let Some(session) = &stored {
            debug!(
                user = ?session.user.as_ref().map(|u| u.id.as_str()),
                "Restored persisted session"
            );
        }
        let handle = Self::new(store);
        *handle.write() = stored;
        Ok(handle)
    }

    /// Handle with no persistence.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()))
    }

    /// Start a session and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written. The in-memory
    /// session is updated either way.
    pub fn begin(&self, token: impl Into<String>, user: Option<User>) -> Result<()> {
        let session = StoredSession {
            token: token.into(),
            user,
        };
        *self.write() = Some(session.clone());
        self.inner.store.save(&session)
    }

    /// Replace the user of the current session, e.g. after a profile fetch.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn set_user(&self, user: User) -> Result<()> {
        let session = {
            let mut state = self.write();
            let Some(session) = state.as_mut() else {
                return Ok(());
            };
            session.user = Some(user);
            session.clone()
        };
        self.inner.store.save(&session)
    }

    /// End the session and remove it from storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared.
    pub fn end(&self) -> Result<()> {
        *self.write() = None;
        self.inner.store.clear()
    }

    /// The logged-in user, if known.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.read().as_ref().and_then(|s| s.user.clone())
    }

    /// Whether a token is held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// Current token and user.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.read().as_ref().map_or_else(Session::default, |s| Session {
            token: Some(SecretString::from(s.token.clone())),
            user: s.user.clone(),
        })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<StoredSession>> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<StoredSession>> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenProvider for SessionHandle {
    fn token(&self) -> Option<SecretString> {
        self.read()
            .as_ref()
            .map(|s| SecretString::from(s.token.clone()))
    }
}

/// Expose a session token for display in diagnostics, keeping only a prefix.
#[must_use]
pub fn redacted(token: &SecretString) -> String {
    let prefix: String = token.expose_secret().chars().take(6).collect();
    format!("{prefix}…")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketplace_core::{Email, Role, UserId};

    use super::*;

    fn shopper() -> User {
        User {
            id: UserId::new("u1"),
            fullname: "Salma".to_string(),
            email: Email::parse("salma@example.com").unwrap(),
            role: Role::Shopper,
        }
    }

    #[test]
    fn test_begin_and_end() {
        let store = Arc::new(MemorySessionStore::new());
        let handle = SessionHandle::new(store.clone());
        assert!(handle.token().is_none());

        handle.begin("tok-123", Some(shopper())).unwrap();
        assert_eq!(handle.token().unwrap().expose_secret(), "tok-123");
        assert_eq!(store.load().unwrap().unwrap().token, "tok-123");

        handle.end().unwrap();
        assert!(!handle.is_authenticated());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_restore_from_store() {
        let store = Arc::new(MemorySessionStore::with_session(StoredSession {
            token: "persisted".to_string(),
            user: Some(shopper()),
        }));
        let handle = SessionHandle::restore(store).unwrap();
        let session = handle.snapshot();
        assert!(session.has_token());
        assert_eq!(session.user.unwrap().role, Role::Shopper);
    }

    #[test]
    fn test_set_user_without_session_is_noop() {
        let handle = SessionHandle::in_memory();
        handle.set_user(shopper()).unwrap();
        assert!(handle.user().is_none());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("session.json"));
        assert!(store.load().unwrap().is_none());

        let session = StoredSession {
            token: "file-token".to_string(),
            user: Some(shopper()),
        };
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session));

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_reads_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FileSessionStore::new(&path);
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_debug_redacts_token() {
        let handle = SessionHandle::in_memory();
        handle.begin("super-secret-token", None).unwrap();
        let debug = format!("{handle:?}");
        assert!(!debug.contains("super-secret-token"));
        assert_eq!(redacted(&handle.token().unwrap()), "super-…");
    }
}
