//! Session domain module.
//!
//! Holds the single source of truth for "who is logged in":
//!
//! - `model`: the immutable state snapshot (`SessionState`, `Student`)
//! - `store`: the injected context object with publish/subscribe
//! - `token`: persistence of the opaque session token

mod model;
mod store;
mod token;

// Re-export public API
pub use model::{SessionState, Student};
pub use store::{SessionStore, StateSubscription};
pub use token::{FileTokenStore, TokenStore};
