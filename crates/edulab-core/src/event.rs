//! Typed application event bus.
//!
//! Replaces ambient document-wide events with an explicit, injectable channel:
//! components receive an [`EventBus`] handle at construction and register or
//! unregister themselves, so each dependency is declared rather than
//! discovered at runtime.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Application-level events that cross component boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A session-bound action was attempted while logged out, or the backend
    /// declared the session invalid.
    LoginRequired,
    /// The login UI should be presented.
    ShowLogin,
    /// An error analysis for the most recent failed execution is available.
    AnalysisAvailable { analysis: String },
}

type Handler = Arc<dyn Fn(&AppEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: Vec<(u64, Handler)>,
}

/// Cheaply clonable publish/subscribe handle.
///
/// Handlers run synchronously within [`EventBus::emit`], in registration
/// order. The cooperative single-consumer model means no handler observes a
/// partially applied state change.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler and returns its subscription handle.
    pub fn subscribe<F>(&self, handler: F) -> EventSubscription
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock().expect("event registry poisoned");
        let id = registry.next_id;
        registry.next_id += 1;
        registry.handlers.push((id, Arc::new(handler)));
        EventSubscription {
            id,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Invokes every live handler with the event.
    ///
    /// Handlers are cloned out of the registry before invocation so a handler
    /// may subscribe or unsubscribe without deadlocking the bus.
    pub fn emit(&self, event: &AppEvent) {
        let handlers: Vec<Handler> = {
            let registry = self.registry.lock().expect("event registry poisoned");
            registry.handlers.iter().map(|(_, h)| Arc::clone(h)).collect()
        };
        for handler in handlers {
            handler(event);
        }
    }
}

/// Handle returned by [`EventBus::subscribe`]; call [`unsubscribe`] to detach.
///
/// [`unsubscribe`]: EventSubscription::unsubscribe
pub struct EventSubscription {
    id: u64,
    registry: Arc<Mutex<Registry>>,
}

impl EventSubscription {
    /// Removes the handler from the bus.
    pub fn unsubscribe(self) {
        let mut registry = self.registry.lock().expect("event registry poisoned");
        registry.handlers.retain(|(id, _)| *id != self.id);
    }
}
