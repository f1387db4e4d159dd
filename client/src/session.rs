//! Who is using the client right now.
//!
//! A [`Session`] is an explicitly created, cheaply-cloneable handle. Every
//! clone shares one `watch` channel holding the current [`SessionSnapshot`];
//! state changes replace the snapshot in a single `send_replace`, so a reader
//! sees either "authenticated with matching user and token" or
//! "unauthenticated", never something in between.
//!
//! Durable storage is touched from this module only. Other components read
//! snapshots.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use shared::types::{Role, StorageConfig, User, UserPatch};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::storage::{Storage, StorageError};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to serialize user record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("no user is signed in")]
    NotAuthenticated,

    #[error("refusing to store an empty token")]
    EmptyToken,

    #[error("session has been disposed")]
    Disposed,
}

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// Authentication state. A token without a user (or the reverse) has no
/// representation.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticated { user: User, token: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub auth: AuthState,
    /// True until the first `check_auth` completes.
    pub loading: bool,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth, AuthState::Authenticated { .. })
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn user(&self) -> Option<&User> {
        match &self.auth {
            AuthState::Authenticated { user, .. } => Some(user),
            AuthState::Unauthenticated => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match &self.auth {
            AuthState::Authenticated { token, .. } => Some(token),
            AuthState::Unauthenticated => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.user().map(|u| u.role)
    }
}

/// Names of the two durable entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub token: String,
    pub user: String,
}

impl From<&StorageConfig> for StorageKeys {
    fn from(cfg: &StorageConfig) -> Self {
        Self {
            token: cfg.token_key.clone(),
            user: cfg.user_key.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    storage: Arc<dyn Storage>,
    keys: StorageKeys,
    state: watch::Sender<SessionSnapshot>,
    /// Serializes storage + memory updates so two writers can't interleave.
    write_lock: Mutex<()>,
    disposed: AtomicBool,
}

impl Session {
    /// New session in the "still loading, not signed in" state. Call
    /// [`Session::check_auth`] to pick up a stored login.
    pub fn create(storage: Arc<dyn Storage>, keys: StorageKeys) -> Self {
        let (state, _) = watch::channel(SessionSnapshot {
            auth: AuthState::Unauthenticated,
            loading: true,
        });

        Self {
            inner: Arc::new(SessionInner {
                storage,
                keys,
                state,
                write_lock: Mutex::new(()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Stop accepting state changes. Snapshots stay readable.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::SeqCst) {
            debug!("Session disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Receive every future snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    /// Current bearer token, if signed in.
    pub fn token(&self) -> Option<String> {
        self.inner.state.borrow().token().map(str::to_string)
    }

    /// Load the stored login, if any. Never fails: unreadable or incomplete
    /// storage leaves the session signed out. Clears `loading`. A disposed
    /// session keeps its snapshot and only reports it.
    pub fn check_auth(&self) -> bool {
        if self.is_disposed() {
            return self.inner.state.borrow().is_authenticated();
        }

        let auth = self.read_stored_or_signed_out();
        let authenticated = matches!(auth, AuthState::Authenticated { .. });

        self.inner.state.send_replace(SessionSnapshot {
            auth,
            loading: false,
        });

        debug!("check_auth finished, authenticated={}", authenticated);
        authenticated
    }

    /// Re-read storage and adopt it if another process changed it (the
    /// "window refocused" hook). Returns whether the in-memory state changed.
    pub fn reconcile(&self) -> bool {
        if self.is_disposed() {
            return false;
        }

        let stored = self.read_stored_or_signed_out();
        let changed = self.inner.state.send_if_modified(|snap| {
            if snap.auth == stored {
                false
            } else {
                snap.auth = stored.clone();
                true
            }
        });

        if changed {
            info!("Session reconciled with durable storage");
        }
        changed
    }

    /// Persist `user` and `token`, then switch the in-memory state in one
    /// step. On a storage failure nothing changes.
    pub fn login(&self, user: User, token: String) -> Result<(), SessionError> {
        self.ensure_live()?;
        if token.trim().is_empty() {
            return Err(SessionError::EmptyToken);
        }

        let _guard = self.write_guard();
        let user_json = serde_json::to_string(&user)?;
        self.inner.storage.set_all(&[
            (self.inner.keys.token.as_str(), token.as_str()),
            (self.inner.keys.user.as_str(), user_json.as_str()),
        ])?;

        info!("User {} ({}) signed in as {}", user.username, user.id, user.role);

        self.inner.state.send_replace(SessionSnapshot {
            auth: AuthState::Authenticated { user, token },
            loading: false,
        });
        Ok(())
    }

    /// Forget the login in storage and memory. Memory is cleared even when
    /// storage can't be updated. Calling it twice is harmless.
    pub fn logout(&self) {
        if self.is_disposed() {
            return;
        }

        let _guard = self.write_guard();
        if let Err(e) = self
            .inner
            .storage
            .remove_all(&[self.inner.keys.token.as_str(), self.inner.keys.user.as_str()])
        {
            warn!("Failed to clear stored login: {}", e);
        }

        let was_signed_in = self.inner.state.borrow().is_authenticated();
        self.inner.state.send_replace(SessionSnapshot {
            auth: AuthState::Unauthenticated,
            loading: false,
        });

        if was_signed_in {
            info!("User signed out");
        }
    }

    /// Merge a self-service profile edit into the signed-in user, in storage
    /// and in memory. The token is untouched.
    pub fn set_user(&self, patch: &UserPatch) -> Result<User, SessionError> {
        self.ensure_live()?;

        let _guard = self.write_guard();
        let mut user = self
            .inner
            .state
            .borrow()
            .user()
            .cloned()
            .ok_or(SessionError::NotAuthenticated)?;

        user.apply(patch);
        let user_json = serde_json::to_string(&user)?;
        self.inner
            .storage
            .set_all(&[(self.inner.keys.user.as_str(), user_json.as_str())])?;

        let updated = user.clone();
        self.inner.state.send_modify(|snap| {
            if let AuthState::Authenticated { user: current, .. } = &mut snap.auth {
                *current = updated;
            }
        });

        debug!("Session user {} updated", user.id);
        Ok(user)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.is_disposed() {
            Err(SessionError::Disposed)
        } else {
            Ok(())
        }
    }

    fn write_guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.inner
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_stored_or_signed_out(&self) -> AuthState {
        match self.read_stored() {
            Ok(auth) => auth,
            Err(e) => {
                warn!("Could not read stored login, treating as signed out: {}", e);
                AuthState::Unauthenticated
            }
        }
    }

    fn read_stored(&self) -> Result<AuthState, SessionError> {
        let token = self.inner.storage.get(&self.inner.keys.token)?;
        let user = self.inner.storage.get(&self.inner.keys.user)?;

        match (token, user) {
            (Some(token), Some(user_json)) if !token.trim().is_empty() => {
                let user: User = serde_json::from_str(&user_json)?;
                Ok(AuthState::Authenticated { user, token })
            }
            (None, None) => Ok(AuthState::Unauthenticated),
            _ => {
                debug!("Stored login is incomplete, ignoring it");
                Ok(AuthState::Unauthenticated)
            }
        }
    }
}
