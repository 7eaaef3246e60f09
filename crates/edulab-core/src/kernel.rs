//! Kernel I/O message types.
//!
//! The kernel transport multiplexes messages from concurrently executing
//! cells onto one stream; every message carries the identifier of the
//! execute request it belongs to (`parent_id`, the correlation key). The
//! closed enum makes an unrecognized message kind a compile-time
//! impossibility instead of a silent no-op.

use serde::{Deserialize, Serialize};

/// Kernel scheduler state reported by `status` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelStatus {
    Busy,
    Idle,
}

/// A single message observed on the kernel I/O channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg_type", rename_all = "snake_case")]
pub enum KernelMessage {
    /// Echo of the code the kernel is about to run.
    ExecuteInput {
        parent_id: String,
        code: String,
        #[serde(default)]
        execution_count: Option<i64>,
    },
    /// Incremental stdout/stderr text.
    Stream { parent_id: String, text: String },
    /// Value produced by the execution, if it has a textual representation.
    ExecuteResult {
        parent_id: String,
        #[serde(default)]
        text: Option<String>,
    },
    /// An exception raised by the executed code.
    Error {
        parent_id: String,
        ename: String,
        evalue: String,
        #[serde(default)]
        traceback: Vec<String>,
    },
    /// Kernel lifecycle signal; `Idle` marks the end of a request.
    Status {
        parent_id: String,
        state: KernelStatus,
    },
}
