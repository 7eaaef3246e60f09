//! Tracking collaborator contract.
//!
//! The correlator reports finished executions through this trait; the HTTP
//! client provides the real implementation. Defining the trait here keeps the
//! dependency direction one-way (client depends on core), the same dynamic
//! dispatch seam used elsewhere to avoid circular crate dependencies.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error code the backend returns when the session is invalid or expired.
pub const NOT_LOGGED_IN: &str = "NOT_LOGGED_IN";

/// Payload submitted for one finished execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackExecutionRequest {
    pub session_id: String,
    pub cell_id: String,
    pub cell_content: String,
    pub execution_count: Option<i64>,
    pub output: String,
    pub error_output: String,
    pub execution_time_ms: i64,
}

/// Backend response to a tracking submission.
///
/// `analysis` carries the LLM's explanation of a failed execution when the
/// backend produced one; the wire field is `chatgpt_analysis`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackExecutionResponse {
    pub success: bool,
    #[serde(default)]
    pub log_id: Option<String>,
    #[serde(default, alias = "chatgpt_analysis")]
    pub analysis: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

impl TrackExecutionResponse {
    /// True when the backend declared the session invalid.
    pub fn is_not_logged_in(&self) -> bool {
        self.error_code.as_deref() == Some(NOT_LOGGED_IN)
    }
}

/// Collaborator that records one execution for later analytics.
#[async_trait]
pub trait TrackingSink: Send + Sync {
    async fn track_execution(
        &self,
        request: &TrackExecutionRequest,
    ) -> Result<TrackExecutionResponse>;
}
