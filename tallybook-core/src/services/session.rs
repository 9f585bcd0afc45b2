//! Session store - the currently signed-in identity

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::domain::Identity;
use crate::ports::SessionStorage;

use super::observer::Listeners;

/// Snapshot of the session
///
/// Authentication is derived from the presence of an identity, so the two
/// can never disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    identity: Option<Identity>,
}

impl Session {
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

/// Shared handle to the application session
///
/// Clones share the same state. Every mutation is mirrored to the durable
/// [`SessionStorage`]; storage failures are logged and otherwise ignored, so
/// none of these operations can fail.
#[derive(Clone)]
pub struct SessionStore {
    session: Arc<Mutex<Session>>,
    listeners: Arc<Listeners<Session>>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    /// Create an unauthenticated store
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::default())),
            listeners: Arc::new(Listeners::new()),
            storage,
        }
    }

    /// Reload the identity kept by the durable storage, if any
    ///
    /// Returns whether a session was restored.
    pub fn restore(&self) -> bool {
        match self.storage.get() {
            Ok(Some(identity)) => {
                tracing::debug!(user_id = identity.id, "session restored");
                self.replace(Some(identity));
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("failed to read stored session: {}", e);
                false
            }
        }
    }

    pub fn start_session(&self, identity: Identity) {
        if let Err(e) = self.storage.put(&identity) {
            tracing::warn!("failed to persist session: {}", e);
        }
        tracing::debug!(user_id = identity.id, "session started");
        self.replace(Some(identity));
    }

    pub fn end_session(&self) {
        if let Err(e) = self.storage.clear() {
            tracing::warn!("failed to clear stored session: {}", e);
        }
        tracing::debug!("session ended");
        self.replace(None);
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.lock().identity.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().is_authenticated()
    }

    pub fn snapshot(&self) -> Session {
        self.lock().clone()
    }

    /// Register a listener called with the new session after every change
    pub fn subscribe(&self, listener: impl Fn(&Session) + Send + Sync + 'static) {
        self.listeners.subscribe(listener);
    }

    fn replace(&self, identity: Option<Identity>) {
        let snapshot = {
            let mut session = self.lock();
            session.identity = identity;
            session.clone()
        };
        self.listeners.notify(&snapshot);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
