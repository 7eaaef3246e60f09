//! Execution observation layer.
//!
//! Turns the multiplexed kernel message stream into one finalized report per
//! cell execution, and manages the handler lifecycle across kernel restarts.

pub mod correlator;
pub mod listener;

pub use correlator::ExecutionCorrelator;
pub use listener::{HandlerId, KernelTransport, ListenerRegistry};
