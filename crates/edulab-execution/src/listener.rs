//! Kernel listener lifecycle.
//!
//! Each notebook view observes the kernel session it is bound to. A kernel
//! restart swaps the underlying session's kernel, and the host fires
//! session-ready / kernel-changed events liberally, so two invariants are
//! enforced here:
//!
//! - attaching is idempotent per view identity, and
//! - each kernel session has at most one live handler; installing a new one
//!   first detaches the previous handler for that session.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Identifier of one installed message handler.
pub type HandlerId = u64;

/// The host's kernel connection, abstracted for testing.
///
/// `attach` installs a message handler on the kernel session's I/O channel
/// and returns its id; `detach` removes a previously installed handler.
pub trait KernelTransport: Send + Sync {
    fn attach(&self, kernel_session_id: &str) -> HandlerId;
    fn detach(&self, kernel_session_id: &str, handler: HandlerId);
}

/// Tracks which views are wired up and which handler each kernel session
/// currently owns.
pub struct ListenerRegistry {
    transport: Arc<dyn KernelTransport>,
    /// View identities already attached; guards re-attachment.
    attached_views: HashSet<String>,
    /// View id -> the kernel session it currently observes.
    view_sessions: HashMap<String, String>,
    /// Kernel session id -> its single live handler.
    handlers: HashMap<String, HandlerId>,
}

impl ListenerRegistry {
    pub fn new(transport: Arc<dyn KernelTransport>) -> Self {
        Self {
            transport,
            attached_views: HashSet::new(),
            view_sessions: HashMap::new(),
            handlers: HashMap::new(),
        }
    }

    /// Wires a notebook view to its kernel session.
    ///
    /// Returns `false` when the view was already attached (the duplicate is
    /// ignored; first registration wins).
    pub fn attach_view(&mut self, view_id: &str, kernel_session_id: &str) -> bool {
        if !self.attached_views.insert(view_id.to_string()) {
            debug!(view = %view_id, "view already attached, ignoring");
            return false;
        }
        self.view_sessions
            .insert(view_id.to_string(), kernel_session_id.to_string());
        self.install_handler(kernel_session_id);
        true
    }

    /// Handles a kernel change on a view's session (e.g. a restart).
    ///
    /// The previous handler for the session is detached before a new one is
    /// installed, so the session never carries two handlers.
    pub fn kernel_changed(&mut self, view_id: &str, kernel_session_id: &str) {
        if !self.attached_views.contains(view_id) {
            debug!(view = %view_id, "kernel change for unattached view, ignoring");
            return;
        }
        if let Some(previous_session) = self
            .view_sessions
            .insert(view_id.to_string(), kernel_session_id.to_string())
        {
            if previous_session != kernel_session_id {
                self.remove_handler(&previous_session);
            }
        }
        self.install_handler(kernel_session_id);
    }

    /// Detaches a disposed view and frees its identity for reuse.
    pub fn dispose_view(&mut self, view_id: &str) {
        if !self.attached_views.remove(view_id) {
            return;
        }
        if let Some(session_id) = self.view_sessions.remove(view_id) {
            // Only detach when no surviving view still observes the session.
            let still_used = self.view_sessions.values().any(|s| *s == session_id);
            if !still_used {
                self.remove_handler(&session_id);
            }
        }
    }

    /// Whether a view is currently attached.
    pub fn is_attached(&self, view_id: &str) -> bool {
        self.attached_views.contains(view_id)
    }

    /// Number of live handlers across all kernel sessions.
    pub fn live_handlers(&self) -> usize {
        self.handlers.len()
    }

    fn install_handler(&mut self, kernel_session_id: &str) {
        self.remove_handler(kernel_session_id);
        let handler = self.transport.attach(kernel_session_id);
        self.handlers.insert(kernel_session_id.to_string(), handler);
    }

    fn remove_handler(&mut self, kernel_session_id: &str) {
        if let Some(previous) = self.handlers.remove(kernel_session_id) {
            self.transport.detach(kernel_session_id, previous);
        }
    }
}
