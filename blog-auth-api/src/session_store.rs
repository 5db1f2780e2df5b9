//! Observable client-side session state.
//!
//! The client binding publishes into a [`SessionStore`]; UI components
//! subscribe with a callback and keep the returned [`Subscription`] for as
//! long as they are mounted.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use once_cell::sync::Lazy;

use crate::responses::{SessionData, UserResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub data: Option<SessionData>,
    pub is_pending: bool,
}

impl SessionState {
    /// Initial state, before the first session read completes.
    pub fn pending() -> Self {
        Self {
            data: None,
            is_pending: true,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            data: None,
            is_pending: false,
        }
    }

    pub fn authenticated(data: SessionData) -> Self {
        Self {
            data: Some(data),
            is_pending: false,
        }
    }

    pub fn user(&self) -> Option<&UserResponse> {
        self.data.as_ref().map(|d| &d.user)
    }
}

type Callback = Arc<dyn Fn(&SessionState) + Send + Sync>;

struct Inner {
    state: SessionState,
    next_id: u64,
    subscribers: BTreeMap<u64, Callback>,
}

pub struct SessionStore {
    inner: Mutex<Inner>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: SessionState::pending(),
                next_id: 0,
                subscribers: BTreeMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> SessionState {
        self.lock().state.clone()
    }

    /// Replaces the state and notifies every subscriber.
    ///
    /// Callbacks run after the internal lock is released, so they may read
    /// the store again.
    pub fn set(&self, state: SessionState) {
        let callbacks: Vec<Callback> = {
            let mut inner = self.lock();
            inner.state = state.clone();
            inner.subscribers.values().cloned().collect()
        };

        for callback in callbacks {
            callback(&state);
        }
    }

    /// Registers `callback` and invokes it once with the current state.
    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        let (id, state) = {
            let mut inner = self.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.insert(id, Arc::clone(&callback));
            (id, inner.state.clone())
        };

        callback(&state);

        Subscription {
            id,
            store: Arc::downgrade(self),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn remove(&self, id: u64) {
        self.lock().subscribers.remove(&id);
    }

    fn clear_subscribers(&self) {
        self.lock().subscribers.clear();
    }
}

/// Live registration of a callback. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    store: Weak<SessionStore>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.remove(self.id);
        }
    }
}

static GLOBAL: Lazy<RwLock<Option<Arc<SessionStore>>>> = Lazy::new(|| RwLock::new(None));

/// Installs the process-wide store, or returns the one already installed.
pub fn init_global() -> Arc<SessionStore> {
    let mut slot = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(slot.get_or_insert_with(|| Arc::new(SessionStore::new())))
}

pub fn global() -> Option<Arc<SessionStore>> {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .map(Arc::clone)
}

/// Deregisters every subscriber and uninstalls the process-wide store.
pub fn shutdown_global() {
    let store = GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take();

    if let Some(store) = store {
        store.clear_subscribers();
        tracing::debug!("session store shut down");
    }
}
