//! Request and response DTOs for the backend API.

use edulab_core::report::AnalyticsReport;
use edulab_core::session::Student;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub student_id: String,
    pub name: String,
    pub notebook_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub student: Option<Student>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// "cloud" or "local", depending on backend configuration.
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckLoginResponse {
    pub logged_in: bool,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub supabase_configured: bool,
    #[serde(default)]
    pub openai_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    /// Free-form notebook context forwarded to the model.
    pub notebook_context: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportResponse {
    pub success: bool,
    #[serde(default)]
    pub report: Option<AnalyticsReport>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

/// Error body the backend attaches to non-2xx JSON responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}
