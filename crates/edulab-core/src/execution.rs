//! Execution record domain model.
//!
//! One record accumulates everything observed for a single kernel execute
//! request, from the input echo until the kernel goes idle.

use chrono::{DateTime, Utc};

/// Accumulated state of one in-flight kernel execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    /// Correlation key: the message id of the originating execute request.
    pub parent_id: String,
    /// Source code echoed back by the kernel.
    pub code: String,
    /// Execution sequence number, when the kernel reported one.
    pub execution_count: Option<i64>,
    /// Ordered output fragments (stream text and result representations).
    pub outputs: Vec<String>,
    /// Ordered formatted error blocks.
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExecutionRecord {
    pub fn new(parent_id: String, code: String, execution_count: Option<i64>) -> Self {
        Self {
            parent_id,
            code,
            execution_count,
            outputs: Vec::new(),
            errors: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Appends an output fragment in arrival order.
    pub fn push_output(&mut self, text: impl Into<String>) {
        self.outputs.push(text.into());
    }

    /// Appends a formatted `"<name>: <value>\n<traceback>"` error block.
    pub fn push_error(&mut self, ename: &str, evalue: &str, traceback: &[String]) {
        let mut block = format!("{ename}: {evalue}");
        if !traceback.is_empty() {
            block.push('\n');
            block.push_str(&traceback.join("\n"));
        }
        self.errors.push(block);
    }

    /// Marks the record finished as of now.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// All output fragments joined in arrival order.
    pub fn combined_output(&self) -> String {
        self.outputs.concat()
    }

    /// All error blocks joined by newlines.
    pub fn combined_errors(&self) -> String {
        self.errors.join("\n")
    }

    /// Wall-clock duration between start and finish, in milliseconds.
    ///
    /// Returns 0 when the record has not finished yet.
    pub fn execution_time_ms(&self) -> i64 {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds().max(0))
            .unwrap_or(0)
    }
}

/// Truncates a string to at most `max_chars` characters on a character
/// boundary, so multibyte text never produces an invalid slice.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
