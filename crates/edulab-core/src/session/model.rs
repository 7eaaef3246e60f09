//! Session state domain model.

use serde::{Deserialize, Serialize};

/// Identity of the logged-in student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
}

/// Snapshot of the login state.
///
/// The state is mutated wholesale on login/logout, never field by field, so
/// `is_logged_in` can rely on `session_id` and `student` being set together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Opaque token issued by the backend at login.
    pub session_id: Option<String>,
    pub student: Option<Student>,
    /// Name of the notebook the student logged in from.
    pub notebook_name: Option<String>,
}

impl SessionState {
    /// Empty, logged-out state.
    pub fn logged_out() -> Self {
        Self::default()
    }

    /// True iff both the session token and the student identity are present.
    pub fn is_logged_in(&self) -> bool {
        self.session_id.is_some() && self.student.is_some()
    }
}
