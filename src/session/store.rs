//! Session store: single source of truth for authentication state.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use super::storage::SessionStorage;
use super::types::{has_token, PersistedSession, Session, User};
use crate::error::RefreshError;

/// Storage key the session is persisted under.
pub const SESSION_STORAGE_KEY: &str = "auth-storage";

type HydrationCallback = Box<dyn FnOnce(&Session) + Send>;

/// Outcome of one token refresh, handed to every waiter.
pub(crate) type RefreshOutcome = Result<String, RefreshError>;

type RefreshWaiters = Vec<oneshot::Sender<RefreshOutcome>>;

struct Inner {
    state: watch::Sender<Session>,
    storage: Arc<dyn SessionStorage>,
    pending_callbacks: Mutex<Vec<HydrationCallback>>,
    /// Held across a mutation and its storage write.
    persist_lock: Mutex<()>,
    /// `Some` while a refresh is in flight; waiters in arrival order.
    refresh_waiters: Mutex<Option<RefreshWaiters>>,
}

/// Handle to the shared authentication state.
///
/// Cloning is cheap; all clones observe and mutate the same session. Every
/// mutation is applied atomically in memory and then mirrored to storage on
/// a best-effort basis.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.state();
        f.debug_struct("SessionStore")
            .field("authenticated", &session.is_authenticated())
            .field("hydrated", &session.hydrated)
            .finish()
    }
}

impl SessionStore {
    /// Create an empty, not yet hydrated store.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            inner: Arc::new(Inner {
                state,
                storage,
                pending_callbacks: Mutex::new(Vec::new()),
                persist_lock: Mutex::new(()),
                refresh_waiters: Mutex::new(None),
            }),
        }
    }

    /// Create a store and hydrate it from storage immediately.
    pub fn open(storage: Arc<dyn SessionStorage>) -> Self {
        let store = Self::new(storage);
        store.hydrate();
        store
    }

    /// Current session snapshot.
    pub fn state(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Current access token.
    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token.clone()
    }

    /// Current refresh token.
    pub fn refresh_token(&self) -> Option<String> {
        self.inner.state.borrow().refresh_token.clone()
    }

    /// Current user.
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    /// Whether the session carries credentials.
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Whether persisted state has been loaded.
    pub fn is_hydrated(&self) -> bool {
        self.inner.state.borrow().hydrated
    }

    /// Receive a notification on every session change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Replace the user and both tokens.
    pub fn login(&self, user: User, access_token: String, refresh_token: String) {
        info!(username = %user.username, "session established");
        self.update(|s| {
            s.user = Some(user);
            s.access_token = Some(access_token);
            s.refresh_token = Some(refresh_token);
        });
    }

    /// Replace the access token, leaving the other fields untouched.
    pub fn set_access_token(&self, token: String) {
        self.update(|s| s.access_token = Some(token));
    }

    /// Replace the refresh token, leaving the other fields untouched.
    pub fn set_refresh_token(&self, token: String) {
        self.update(|s| s.refresh_token = Some(token));
    }

    /// Clear the user and both tokens.
    pub fn logout(&self) {
        info!("session cleared");
        self.update(Session::clear_credentials);
    }

    /// Store the result of exchanging `exchanged` for a new access token.
    ///
    /// Applied only if the session still holds `exchanged` as its refresh
    /// token; returns `false` and changes nothing if the session was cleared
    /// or replaced while the exchange was in flight.
    pub fn apply_refresh(
        &self,
        exchanged: &str,
        access_token: String,
        rotated_refresh_token: Option<String>,
    ) -> bool {
        let _guard = self.lock_persist();
        let applied = self.inner.state.send_if_modified(|s| {
            if s.refresh_token.as_deref() != Some(exchanged) {
                return false;
            }
            s.access_token = Some(access_token);
            if let Some(rotated) = rotated_refresh_token {
                s.refresh_token = Some(rotated);
            }
            true
        });
        if applied {
            self.persist();
        }
        applied
    }

    /// Clear the session, but only if it still holds `refresh_token`.
    pub fn logout_if_current(&self, refresh_token: &str) -> bool {
        let _guard = self.lock_persist();
        let cleared = self.inner.state.send_if_modified(|s| {
            if s.refresh_token.as_deref() != Some(refresh_token) {
                return false;
            }
            s.clear_credentials();
            true
        });
        if cleared {
            info!("session cleared");
            self.persist();
        }
        cleared
    }

    /// Whether a token refresh is in flight for this session.
    pub fn is_refreshing(&self) -> bool {
        self.lock_refresh_waiters().is_some()
    }

    /// Queue for the outcome of the in-flight refresh.
    ///
    /// The flag is `true` when no refresh was in flight and the caller must
    /// start one and later call [`settle_refresh`](Self::settle_refresh).
    pub(crate) fn join_refresh(&self) -> (oneshot::Receiver<RefreshOutcome>, bool) {
        let (tx, rx) = oneshot::channel();
        let mut waiters = self.lock_refresh_waiters();
        match waiters.as_mut() {
            Some(queue) => {
                queue.push(tx);
                (rx, false)
            }
            None => {
                *waiters = Some(vec![tx]);
                (rx, true)
            }
        }
    }

    /// End the in-flight refresh and resolve its waiters in arrival order.
    pub(crate) fn settle_refresh(&self, outcome: RefreshOutcome) {
        let queue = self.lock_refresh_waiters().take().unwrap_or_default();
        debug!(waiters = queue.len(), ok = outcome.is_ok(), "token refresh settled");
        for waiter in queue {
            // A waiter that gave up has dropped its receiver.
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Load persisted state and mark the store hydrated.
    ///
    /// Only the first call has any effect. Unreadable or inconsistent
    /// records are discarded and the store hydrates as signed out.
    pub fn hydrate(&self) {
        if self.is_hydrated() {
            return;
        }

        let persisted = self.load_persisted();
        let mut became_hydrated = false;
        self.inner.state.send_modify(|s| {
            if s.hydrated {
                return;
            }
            if let Some(persisted) = persisted {
                s.user = persisted.state.user;
                s.access_token = persisted.state.access_token;
                s.refresh_token = persisted.state.refresh_token;
            }
            s.hydrated = true;
            became_hydrated = true;
        });

        if !became_hydrated {
            return;
        }

        let snapshot = self.state();
        debug!(authenticated = snapshot.is_authenticated(), "session hydrated");

        let callbacks: Vec<HydrationCallback> = std::mem::take(
            &mut *self
                .inner
                .pending_callbacks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for callback in callbacks {
            callback(&snapshot);
        }
    }

    /// Run `callback` once the store is hydrated (immediately if it already is).
    pub fn on_hydrated<F>(&self, callback: F)
    where
        F: FnOnce(&Session) + Send + 'static,
    {
        {
            let mut pending = self
                .inner
                .pending_callbacks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !self.is_hydrated() {
                pending.push(Box::new(callback));
                return;
            }
        }
        callback(&self.state());
    }

    /// Wait until the store is hydrated.
    pub async fn ready(&self) {
        let mut rx = self.inner.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|s| s.hydrated).await;
    }

    fn update<F>(&self, mutate: F)
    where
        F: FnOnce(&mut Session),
    {
        let _guard = self.lock_persist();
        self.inner.state.send_modify(mutate);
        self.persist();
    }

    fn lock_persist(&self) -> std::sync::MutexGuard<'_, ()> {
        self.inner
            .persist_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_refresh_waiters(&self) -> std::sync::MutexGuard<'_, Option<RefreshWaiters>> {
        self.inner
            .refresh_waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self) {
        let record = PersistedSession::from(&*self.inner.state.borrow());
        let result = serde_json::to_string(&record)
            .map_err(std::io::Error::other)
            .and_then(|json| self.inner.storage.set_item(SESSION_STORAGE_KEY, &json));

        if let Err(e) = result {
            warn!("failed to persist session: {}", e);
        }
    }

    fn load_persisted(&self) -> Option<PersistedSession> {
        let raw = match self.inner.storage.get_item(SESSION_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("failed to read persisted session: {}", e);
                return None;
            }
        };

        let mut persisted: PersistedSession = match serde_json::from_str(&raw) {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!("discarding unreadable persisted session: {}", e);
                return None;
            }
        };

        let state = &mut persisted.state;
        state.access_token = state.access_token.take().filter(|t| !t.is_empty());
        state.refresh_token = state.refresh_token.take().filter(|t| !t.is_empty());
        if has_token(&state.access_token) != has_token(&state.refresh_token) {
            warn!("discarding persisted session with an incomplete token pair");
            state.access_token = None;
            state.refresh_token = None;
        }

        Some(persisted)
    }
}
