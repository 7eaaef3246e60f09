//! Session store: the injected context object all session-bound components
//! share.
//!
//! Mutations replace the whole state and broadcast a snapshot to every
//! subscriber synchronously. There is no hidden global; callers construct one
//! store and pass `Arc<SessionStore>` to whoever needs it.

use super::model::{SessionState, Student};
use super::token::TokenStore;
use crate::event::{AppEvent, EventBus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

type StateHandler = Arc<dyn Fn(&SessionState) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    handlers: Vec<(u64, StateHandler)>,
}

/// Process-wide source of truth for "who is logged in".
pub struct SessionStore {
    state: Mutex<SessionState>,
    subscribers: Arc<Mutex<Subscribers>>,
    initialized: AtomicBool,
    tokens: Arc<dyn TokenStore>,
    events: EventBus,
}

impl SessionStore {
    pub fn new(tokens: Arc<dyn TokenStore>, events: EventBus) -> Self {
        Self {
            state: Mutex::new(SessionState::logged_out()),
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
            initialized: AtomicBool::new(false),
            tokens,
            events,
        }
    }

    /// Forces a clean logged-out state at process start.
    ///
    /// Clears any stale persisted token and broadcasts once. Idempotent: only
    /// the first call has any effect.
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(err) = self.tokens.clear() {
            warn!(error = %err, "failed to clear persisted session token");
        }
        *self.state.lock().expect("session state poisoned") = SessionState::logged_out();
        self.notify();
    }

    /// Replaces the entire state with a logged-in session and broadcasts.
    pub fn set_session(&self, session_id: String, student: Student, notebook_name: String) {
        if let Err(err) = self.tokens.save(&session_id) {
            warn!(error = %err, "failed to persist session token");
        }
        {
            let mut state = self.state.lock().expect("session state poisoned");
            *state = SessionState {
                session_id: Some(session_id),
                student: Some(student),
                notebook_name: Some(notebook_name),
            };
        }
        self.notify();
    }

    /// Resets to logged-out, clears the persisted token, broadcasts.
    pub fn clear_session(&self) {
        if let Err(err) = self.tokens.clear() {
            warn!(error = %err, "failed to clear persisted session token");
        }
        *self.state.lock().expect("session state poisoned") = SessionState::logged_out();
        self.notify();
    }

    /// Registers a handler and immediately invokes it once with the current
    /// state, so a new subscriber never starts from a stale default.
    pub fn subscribe<F>(&self, handler: F) -> StateSubscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let handler: StateHandler = Arc::new(handler);
        let id = {
            let mut subscribers = self.subscribers.lock().expect("subscriber list poisoned");
            let id = subscribers.next_id;
            subscribers.next_id += 1;
            subscribers.handlers.push((id, Arc::clone(&handler)));
            id
        };
        handler(&self.snapshot());
        StateSubscription {
            id,
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    /// Synchronous login guard.
    ///
    /// Returns whether a session is active; when it is not and `show_alert`
    /// is set, emits [`AppEvent::LoginRequired`] so the UI can react.
    pub fn require_login(&self, show_alert: bool) -> bool {
        let logged_in = self.is_logged_in();
        if !logged_in && show_alert {
            self.events.emit(&AppEvent::LoginRequired);
        }
        logged_in
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.lock().expect("session state poisoned").is_logged_in()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.state.lock().expect("session state poisoned").clone()
    }

    /// Current session token, when logged in.
    pub fn session_id(&self) -> Option<String> {
        self.state
            .lock()
            .expect("session state poisoned")
            .session_id
            .clone()
    }

    fn notify(&self) {
        let snapshot = self.snapshot();
        let handlers: Vec<StateHandler> = {
            let subscribers = self.subscribers.lock().expect("subscriber list poisoned");
            subscribers
                .handlers
                .iter()
                .map(|(_, h)| Arc::clone(h))
                .collect()
        };
        for handler in handlers {
            handler(&snapshot);
        }
    }
}

/// Handle returned by [`SessionStore::subscribe`].
pub struct StateSubscription {
    id: u64,
    subscribers: Arc<Mutex<Subscribers>>,
}

impl StateSubscription {
    /// Removes the handler from the store.
    pub fn unsubscribe(self) {
        let mut subscribers = self.subscribers.lock().expect("subscriber list poisoned");
        subscribers.handlers.retain(|(id, _)| *id != self.id);
    }
}
