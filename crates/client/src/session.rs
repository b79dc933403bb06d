//! Session context shared by the gateway and the UI shell.
//!
//! [`SessionContext`] is the single owner of the current [`Session`]. All
//! changes go through [`establish`](SessionContext::establish) and the
//! teardown methods, which keep storage, the in-memory state and the
//! observers in step.
//!
//! Observers get two views:
//! - [`subscribe`](SessionContext::subscribe) delivers every [`SessionEvent`]
//!   (login, logout, expiry) in order;
//! - [`watch`](SessionContext::watch) always holds the latest
//!   [`SessionState`], for code that only cares about "now".

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockWriteGuard, broadcast, watch};

use tillpoint_core::{Role, Session, UserProfile};

use crate::storage::{self, SessionStorage, StorageError};

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Where the session lifecycle currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Stored session not yet restored.
    Loading,
    /// No one is logged in.
    Anonymous,
    /// A user is logged in.
    Authenticated(Session),
}

impl SessionState {
    /// The session, when authenticated.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            Self::Loading | Self::Anonymous => None,
        }
    }

    /// Role of the logged-in user, when authenticated.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.session().map(Session::role)
    }
}

/// Change notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A user logged in.
    Established(UserProfile),
    /// The user logged out.
    LoggedOut,
    /// The server reported the token as expired.
    Expired {
        /// Text suitable for showing on the login screen.
        message: String,
    },
    /// The server reported the token as missing or invalid.
    Rejected {
        /// Text suitable for showing on the login screen.
        message: String,
    },
}

/// Process-wide session holder.
///
/// Cheap to clone; every clone refers to the same session.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<SessionContextInner>,
}

struct SessionContextInner {
    storage: Arc<dyn SessionStorage>,
    state: RwLock<SessionState>,
    state_tx: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionContext {
    /// Create a context in the [`SessionState::Loading`] state.
    ///
    /// Call [`restore`](Self::restore) to load any persisted session.
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Loading);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(SessionContextInner {
                storage,
                state: RwLock::new(SessionState::Loading),
                state_tx,
                events,
            }),
        }
    }

    /// Load the persisted session, leaving `Loading`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if storage cannot be read. The state stays
    /// `Loading` in that case.
    pub async fn restore(&self) -> Result<SessionState, StorageError> {
        let restored = storage::load_session(self.inner.storage.as_ref())?;
        let state = restored.map_or(SessionState::Anonymous, SessionState::Authenticated);

        match &state {
            SessionState::Authenticated(session) => {
                tracing::info!(user_id = %session.user.id, role = %session.role(), "Restored stored session");
            }
            _ => tracing::debug!("No stored session"),
        }

        self.set_state(state.clone()).await;
        Ok(state)
    }

    /// Current state snapshot.
    pub async fn state(&self) -> SessionState {
        self.inner.state.read().await.clone()
    }

    /// Current session, if logged in.
    pub async fn session(&self) -> Option<Session> {
        self.inner.state.read().await.session().cloned()
    }

    /// Current bearer token, if logged in.
    pub async fn token(&self) -> Option<String> {
        self.inner
            .state
            .read()
            .await
            .session()
            .map(|s| s.token.clone())
    }

    /// Store a freshly issued session and notify observers.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be persisted; the
    /// in-memory state is left unchanged in that case.
    pub async fn establish(&self, session: Session) -> Result<(), StorageError> {
        let mut state = self.inner.state.write().await;
        storage::save_session(self.inner.storage.as_ref(), &session)?;

        tracing::info!(user_id = %session.user.id, role = %session.role(), "Session established");
        let user = session.user.clone();
        *state = SessionState::Authenticated(session);
        self.inner.state_tx.send_replace(state.clone());
        drop(state);

        self.notify(SessionEvent::Established(user));
        Ok(())
    }

    /// End the session at the user's request.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if storage cannot be cleared. The in-memory
    /// session is gone regardless.
    pub async fn logout(&self) -> Result<(), StorageError> {
        self.teardown(SessionEvent::LoggedOut).await
    }

    /// End the session because the server reported it expired.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if storage cannot be cleared.
    pub async fn expire(&self, message: impl Into<String>) -> Result<(), StorageError> {
        self.teardown(SessionEvent::Expired {
            message: message.into(),
        })
        .await
    }

    /// End the session because the server refused its token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if storage cannot be cleared.
    pub async fn reject(&self, message: impl Into<String>) -> Result<(), StorageError> {
        self.teardown(SessionEvent::Rejected {
            message: message.into(),
        })
        .await
    }

    /// Tear down the session only if it still carries `token`.
    ///
    /// A response to a request sent with an older token must not log out a
    /// session established after that request left. The comparison and the
    /// teardown happen under one write lock. Returns whether the teardown
    /// happened.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if storage cannot be cleared.
    pub async fn end_if_current(
        &self,
        token: &str,
        event: SessionEvent,
    ) -> Result<bool, StorageError> {
        let state = self.inner.state.write().await;
        if state.session().map(|s| s.token.as_str()) != Some(token) {
            tracing::debug!("Ignoring auth failure for a superseded token");
            return Ok(false);
        }
        self.teardown_locked(state, event)?;
        Ok(true)
    }

    /// Receive every future session event.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Observe the latest session state.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    async fn teardown(&self, event: SessionEvent) -> Result<(), StorageError> {
        let state = self.inner.state.write().await;
        self.teardown_locked(state, event)
    }

    fn teardown_locked(
        &self,
        mut state: RwLockWriteGuard<'_, SessionState>,
        event: SessionEvent,
    ) -> Result<(), StorageError> {
        *state = SessionState::Anonymous;
        self.inner.state_tx.send_replace(SessionState::Anonymous);
        let cleared = storage::clear_session(self.inner.storage.as_ref());
        drop(state);

        match &event {
            SessionEvent::LoggedOut => tracing::info!("Session ended by logout"),
            SessionEvent::Expired { message } | SessionEvent::Rejected { message } => {
                tracing::warn!(reason = %message, "Session ended by server");
            }
            SessionEvent::Established(_) => {}
        }

        self.notify(event);
        cleared
    }

    async fn set_state(&self, new_state: SessionState) {
        let mut state = self.inner.state.write().await;
        *state = new_state;
        self.inner.state_tx.send_replace(state.clone());
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, keys};
    use tillpoint_core::UserId;

    fn session(token: &str, role: Role) -> Session {
        Session::new(
            token.to_owned(),
            UserProfile {
                id: UserId::new(5),
                username: "sam".to_owned(),
                display_name: "Sam".to_owned(),
                role,
            },
        )
    }

    #[tokio::test]
    async fn test_starts_loading_then_restores_anonymous() {
        let ctx = SessionContext::new(Arc::new(MemoryStorage::new()));
        assert_eq!(ctx.state().await, SessionState::Loading);

        let restored = ctx.restore().await.unwrap();
        assert_eq!(restored, SessionState::Anonymous);
        assert_eq!(*ctx.watch().borrow(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_restore_picks_up_stored_session() {
        let storage = Arc::new(MemoryStorage::new());
        storage::save_session(storage.as_ref(), &session("t", Role::Cashier)).unwrap();

        let ctx = SessionContext::new(storage);
        ctx.restore().await.unwrap();

        assert_eq!(ctx.token().await.as_deref(), Some("t"));
        assert_eq!(ctx.state().await.role(), Some(Role::Cashier));
    }

    #[tokio::test]
    async fn test_establish_persists_and_notifies() {
        let storage = Arc::new(MemoryStorage::new());
        let ctx = SessionContext::new(storage.clone());
        let mut events = ctx.subscribe();

        ctx.establish(session("abc", Role::Admin)).await.unwrap();

        assert_eq!(storage.get(keys::TOKEN).unwrap().as_deref(), Some("abc"));
        assert!(storage.get(keys::USER).unwrap().is_some());
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::Established(user) if user.role == Role::Admin
        ));
    }

    #[tokio::test]
    async fn test_expire_clears_token_and_user_together() {
        let storage = Arc::new(MemoryStorage::new());
        let ctx = SessionContext::new(storage.clone());
        ctx.establish(session("abc", Role::Admin)).await.unwrap();
        let mut events = ctx.subscribe();
        let watcher = ctx.watch();

        ctx.expire("Token expired").await.unwrap();

        assert_eq!(ctx.session().await, None);
        assert_eq!(storage.get(keys::TOKEN).unwrap(), None);
        assert_eq!(storage.get(keys::USER).unwrap(), None);
        assert_eq!(*watcher.borrow(), SessionState::Anonymous);
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::Expired {
                message: "Token expired".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn test_end_if_current_ignores_superseded_token() {
        let ctx = SessionContext::new(Arc::new(MemoryStorage::new()));
        ctx.establish(session("new", Role::Cashier)).await.unwrap();

        let ended = ctx
            .end_if_current("old", SessionEvent::LoggedOut)
            .await
            .unwrap();
        assert!(!ended);
        assert_eq!(ctx.token().await.as_deref(), Some("new"));

        let ended = ctx
            .end_if_current("new", SessionEvent::LoggedOut)
            .await
            .unwrap();
        assert!(ended);
        assert_eq!(ctx.token().await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stale_failure_racing_login_keeps_new_session() {
        for _ in 0..200 {
            let ctx = SessionContext::new(Arc::new(MemoryStorage::new()));
            ctx.establish(session("old", Role::Cashier)).await.unwrap();

            let stale = tokio::spawn({
                let ctx = ctx.clone();
                async move {
                    ctx.end_if_current(
                        "old",
                        SessionEvent::Expired {
                            message: "Token expired".to_owned(),
                        },
                    )
                    .await
                }
            });
            let login = tokio::spawn({
                let ctx = ctx.clone();
                async move { ctx.establish(session("new", Role::Admin)).await }
            });
            stale.await.unwrap().unwrap();
            login.await.unwrap().unwrap();

            assert_eq!(ctx.token().await.as_deref(), Some("new"));
            assert_eq!(ctx.state().await.role(), Some(Role::Admin));
        }
    }

    #[tokio::test]
    async fn test_logout_without_subscribers() {
        let ctx = SessionContext::new(Arc::new(MemoryStorage::new()));
        ctx.establish(session("x", Role::Cashier)).await.unwrap();
        ctx.logout().await.unwrap();
        assert_eq!(ctx.state().await, SessionState::Anonymous);
    }
}
