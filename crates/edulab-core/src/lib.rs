pub mod chat;
pub mod config;
pub mod error;
pub mod event;
pub mod execution;
pub mod kernel;
pub mod report;
pub mod session;
pub mod tracking;

// Re-export common error type
pub use error::{EdulabError, Result};
