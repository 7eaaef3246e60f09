//! Kernel execution correlator.
//!
//! Matches asynchronous kernel I/O messages to logical cell executions by
//! correlation key and reports each finished execution to the tracking
//! collaborator exactly once.

use edulab_core::event::{AppEvent, EventBus};
use edulab_core::execution::{ExecutionRecord, truncate_chars};
use edulab_core::kernel::{KernelMessage, KernelStatus};
use edulab_core::session::SessionStore;
use edulab_core::tracking::{TrackExecutionRequest, TrackingSink};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Output text is capped before submission to bound payload size.
const MAX_OUTPUT_CHARS: usize = 10_000;
/// Error text cap, matching the tracking collaborator's column limit.
const MAX_ERROR_CHARS: usize = 5_000;

/// Correlates the multiplexed kernel message stream into per-execution
/// records.
///
/// State machine per correlation key: an `execute_input` opens a record,
/// `stream`/`execute_result`/`error` accumulate into it, and `status: idle`
/// closes and reports it. The record is removed from the map before the
/// report is issued, so duplicate idle events (or a double-registered
/// handler) can never produce a second submission for the same key.
pub struct ExecutionCorrelator {
    open: HashMap<String, ExecutionRecord>,
    session: Arc<SessionStore>,
    tracker: Arc<dyn TrackingSink>,
    events: EventBus,
}

impl ExecutionCorrelator {
    pub fn new(session: Arc<SessionStore>, tracker: Arc<dyn TrackingSink>, events: EventBus) -> Self {
        Self {
            open: HashMap::new(),
            session,
            tracker,
            events,
        }
    }

    /// Processes one kernel message.
    ///
    /// Messages for a single execution arrive in emission order; this method
    /// relies on that order and does not reorder. Suspends only when an idle
    /// message triggers a tracking submission.
    pub async fn handle_message(&mut self, message: KernelMessage) {
        match message {
            KernelMessage::ExecuteInput {
                parent_id,
                code,
                execution_count,
            } => {
                if self.open.contains_key(&parent_id) {
                    // Duplicate attach anomaly; first registration wins.
                    warn!(key = %parent_id, "duplicate execute_input for open record, ignoring");
                    return;
                }
                self.open.insert(
                    parent_id.clone(),
                    ExecutionRecord::new(parent_id, code, execution_count),
                );
            }
            KernelMessage::Stream { parent_id, text } => {
                match self.open.get_mut(&parent_id) {
                    Some(record) => record.push_output(text),
                    // Late or untracked output is dropped; known lossy edge.
                    None => debug!(key = %parent_id, "stream output for unknown key, dropped"),
                }
            }
            KernelMessage::ExecuteResult { parent_id, text } => {
                if let Some(record) = self.open.get_mut(&parent_id) {
                    if let Some(text) = text {
                        record.push_output(text);
                    }
                } else {
                    debug!(key = %parent_id, "execute_result for unknown key, dropped");
                }
            }
            KernelMessage::Error {
                parent_id,
                ename,
                evalue,
                traceback,
            } => {
                match self.open.get_mut(&parent_id) {
                    Some(record) => record.push_error(&ename, &evalue, &traceback),
                    None => debug!(key = %parent_id, "error for unknown key, dropped"),
                }
            }
            KernelMessage::Status { parent_id, state } => {
                if state == KernelStatus::Idle {
                    self.on_idle(&parent_id).await;
                }
            }
        }
    }

    /// Number of executions still awaiting their idle signal.
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    async fn on_idle(&mut self, parent_id: &str) {
        let has_code = self
            .open
            .get(parent_id)
            .map(|record| !record.code.is_empty())
            .unwrap_or(false);
        if !has_code {
            return;
        }

        // Remove before reporting so a duplicate idle cannot flush twice.
        let mut record = match self.open.remove(parent_id) {
            Some(record) => record,
            None => return,
        };
        record.finish();
        self.submit(record).await;
    }

    async fn submit(&self, record: ExecutionRecord) {
        // Execution already ran in the kernel; only reporting is gated.
        let session_id = match self.session.session_id() {
            Some(id) => id,
            None => {
                debug!(key = %record.parent_id, "not logged in, skipping execution report");
                return;
            }
        };

        let had_errors = record.has_errors();
        let request = TrackExecutionRequest {
            session_id,
            cell_id: record.parent_id.clone(),
            cell_content: record.code.clone(),
            execution_count: record.execution_count,
            output: truncate_chars(&record.combined_output(), MAX_OUTPUT_CHARS),
            error_output: truncate_chars(&record.combined_errors(), MAX_ERROR_CHARS),
            execution_time_ms: record.execution_time_ms(),
        };

        match self.tracker.track_execution(&request).await {
            Ok(response) => {
                if response.is_not_logged_in() {
                    // Server is authoritative over session validity.
                    self.force_logout();
                    return;
                }
                if had_errors {
                    if let Some(analysis) = response.analysis {
                        self.events.emit(&AppEvent::AnalysisAvailable { analysis });
                    }
                }
            }
            Err(err) if err.is_auth() => self.force_logout(),
            Err(err) => {
                // Reporting is best-effort; the execution itself already ran.
                warn!(key = %record.parent_id, error = %err, "execution tracking failed");
            }
        }
    }

    fn force_logout(&self) {
        self.session.clear_session();
        self.events.emit(&AppEvent::LoginRequired);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use edulab_core::error::{EdulabError, Result};
    use edulab_core::session::{Student, TokenStore};
    use edulab_core::tracking::TrackExecutionResponse;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MemoryTokenStore {
        token: Mutex<Option<String>>,
    }

    impl MemoryTokenStore {
        fn new() -> Self {
            Self {
                token: Mutex::new(None),
            }
        }
    }

    impl TokenStore for MemoryTokenStore {
        fn load(&self) -> Result<Option<String>> {
            Ok(self.token.lock().unwrap().clone())
        }

        fn save(&self, token: &str) -> Result<()> {
            *self.token.lock().unwrap() = Some(token.to_string());
            Ok(())
        }

        fn clear(&self) -> Result<()> {
            *self.token.lock().unwrap() = None;
            Ok(())
        }
    }

    struct MockTracker {
        requests: Mutex<Vec<TrackExecutionRequest>>,
        response: Mutex<Result<TrackExecutionResponse>>,
    }

    impl MockTracker {
        fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                response: Mutex::new(Ok(TrackExecutionResponse {
                    success: true,
                    ..Default::default()
                })),
            }
        }

        fn with_response(response: Result<TrackExecutionResponse>) -> Self {
            let tracker = Self::new();
            *tracker.response.lock().unwrap() = response;
            tracker
        }

        fn submissions(&self) -> Vec<TrackExecutionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TrackingSink for MockTracker {
        async fn track_execution(
            &self,
            request: &TrackExecutionRequest,
        ) -> Result<TrackExecutionResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.response.lock().unwrap().clone()
        }
    }

    fn logged_in_store(events: &EventBus) -> Arc<SessionStore> {
        let store = Arc::new(SessionStore::new(
            Arc::new(MemoryTokenStore::new()),
            events.clone(),
        ));
        store.initialize();
        store.set_session(
            "s-1".to_string(),
            Student {
                id: "S1".to_string(),
                name: "Alice".to_string(),
            },
            "lab1.ipynb".to_string(),
        );
        store
    }

    fn input(key: &str, code: &str) -> KernelMessage {
        KernelMessage::ExecuteInput {
            parent_id: key.to_string(),
            code: code.to_string(),
            execution_count: Some(1),
        }
    }

    fn idle(key: &str) -> KernelMessage {
        KernelMessage::Status {
            parent_id: key.to_string(),
            state: KernelStatus::Idle,
        }
    }

    #[tokio::test]
    async fn test_error_execution_reported_once() {
        // input + error + idle produces exactly one submission with the
        // formatted error block and empty output.
        let events = EventBus::new();
        let tracker = Arc::new(MockTracker::new());
        let mut correlator =
            ExecutionCorrelator::new(logged_in_store(&events), tracker.clone(), events.clone());

        correlator.handle_message(input("m1", "1/0")).await;
        correlator
            .handle_message(KernelMessage::Error {
                parent_id: "m1".to_string(),
                ename: "ZeroDivisionError".to_string(),
                evalue: "division by zero".to_string(),
                traceback: vec![],
            })
            .await;
        correlator.handle_message(idle("m1")).await;

        let submissions = tracker.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].cell_content, "1/0");
        assert_eq!(submissions[0].output, "");
        assert!(
            submissions[0]
                .error_output
                .contains("ZeroDivisionError: division by zero")
        );
        assert_eq!(correlator.open_count(), 0);
    }

    #[tokio::test]
    async fn test_at_most_one_report_per_key() {
        // duplicated input echoes and idle events still yield a single
        // submission
        let events = EventBus::new();
        let tracker = Arc::new(MockTracker::new());
        let mut correlator =
            ExecutionCorrelator::new(logged_in_store(&events), tracker.clone(), events.clone());

        correlator.handle_message(input("m1", "print(1)")).await;
        correlator.handle_message(input("m1", "overwritten?")).await;
        correlator
            .handle_message(KernelMessage::Stream {
                parent_id: "m1".to_string(),
                text: "1\n".to_string(),
            })
            .await;
        correlator.handle_message(idle("m1")).await;
        correlator.handle_message(idle("m1")).await;

        let submissions = tracker.submissions();
        assert_eq!(submissions.len(), 1);
        // first registration wins
        assert_eq!(submissions[0].cell_content, "print(1)");
        assert_eq!(submissions[0].output, "1\n");
    }

    #[tokio::test]
    async fn test_interleaved_executions_stay_separate() {
        let events = EventBus::new();
        let tracker = Arc::new(MockTracker::new());
        let mut correlator =
            ExecutionCorrelator::new(logged_in_store(&events), tracker.clone(), events.clone());

        correlator.handle_message(input("m1", "print('a')")).await;
        correlator.handle_message(input("m2", "print('b')")).await;
        correlator
            .handle_message(KernelMessage::Stream {
                parent_id: "m2".to_string(),
                text: "b".to_string(),
            })
            .await;
        correlator
            .handle_message(KernelMessage::Stream {
                parent_id: "m1".to_string(),
                text: "a".to_string(),
            })
            .await;
        correlator.handle_message(idle("m1")).await;
        correlator.handle_message(idle("m2")).await;

        let submissions = tracker.submissions();
        assert_eq!(submissions.len(), 2);
        let by_key: HashMap<_, _> = submissions
            .iter()
            .map(|s| (s.cell_id.clone(), s.output.clone()))
            .collect();
        assert_eq!(by_key["m1"], "a");
        assert_eq!(by_key["m2"], "b");
    }

    #[tokio::test]
    async fn test_idle_without_record_is_noop() {
        let events = EventBus::new();
        let tracker = Arc::new(MockTracker::new());
        let mut correlator =
            ExecutionCorrelator::new(logged_in_store(&events), tracker.clone(), events.clone());

        correlator.handle_message(idle("ghost")).await;
        assert!(tracker.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_error_without_record_is_dropped() {
        let events = EventBus::new();
        let tracker = Arc::new(MockTracker::new());
        let mut correlator =
            ExecutionCorrelator::new(logged_in_store(&events), tracker.clone(), events.clone());

        correlator
            .handle_message(KernelMessage::Error {
                parent_id: "ghost".to_string(),
                ename: "NameError".to_string(),
                evalue: "x".to_string(),
                traceback: vec![],
            })
            .await;
        correlator.handle_message(idle("ghost")).await;

        assert_eq!(correlator.open_count(), 0);
        assert!(tracker.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_empty_code_is_not_reported() {
        let events = EventBus::new();
        let tracker = Arc::new(MockTracker::new());
        let mut correlator =
            ExecutionCorrelator::new(logged_in_store(&events), tracker.clone(), events.clone());

        correlator.handle_message(input("m1", "")).await;
        correlator.handle_message(idle("m1")).await;
        assert!(tracker.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_logged_out_skips_submission() {
        let events = EventBus::new();
        let store = Arc::new(SessionStore::new(
            Arc::new(MemoryTokenStore::new()),
            events.clone(),
        ));
        store.initialize();
        let tracker = Arc::new(MockTracker::new());
        let mut correlator = ExecutionCorrelator::new(store, tracker.clone(), events.clone());

        correlator.handle_message(input("m1", "print(1)")).await;
        correlator.handle_message(idle("m1")).await;

        assert!(tracker.submissions().is_empty());
        // The record is still consumed; a later idle cannot resurrect it.
        assert_eq!(correlator.open_count(), 0);
    }

    #[tokio::test]
    async fn test_late_stream_after_idle_is_dropped() {
        let events = EventBus::new();
        let tracker = Arc::new(MockTracker::new());
        let mut correlator =
            ExecutionCorrelator::new(logged_in_store(&events), tracker.clone(), events.clone());

        correlator.handle_message(input("m1", "print(1)")).await;
        correlator.handle_message(idle("m1")).await;
        correlator
            .handle_message(KernelMessage::Stream {
                parent_id: "m1".to_string(),
                text: "too late".to_string(),
            })
            .await;

        let submissions = tracker.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].output, "");
    }

    #[tokio::test]
    async fn test_not_logged_in_response_forces_logout() {
        // The backend declaring the session invalid must log the client out.
        let events = EventBus::new();
        let prompts = Arc::new(AtomicUsize::new(0));
        let prompts_clone = Arc::clone(&prompts);
        let _sub = events.subscribe(move |event| {
            if matches!(event, AppEvent::LoginRequired) {
                prompts_clone.fetch_add(1, Ordering::SeqCst);
            }
        });

        let store = logged_in_store(&events);
        let tracker = Arc::new(MockTracker::with_response(Ok(TrackExecutionResponse {
            success: false,
            error: Some("login first".to_string()),
            error_code: Some("NOT_LOGGED_IN".to_string()),
            ..Default::default()
        })));
        let mut correlator =
            ExecutionCorrelator::new(store.clone(), tracker.clone(), events.clone());

        correlator.handle_message(input("m1", "print(1)")).await;
        correlator.handle_message(idle("m1")).await;

        assert!(!store.is_logged_in());
        assert_eq!(prompts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_auth_error_forces_logout() {
        let events = EventBus::new();
        let store = logged_in_store(&events);
        let tracker = Arc::new(MockTracker::with_response(Err(EdulabError::auth(
            "session expired",
        ))));
        let mut correlator =
            ExecutionCorrelator::new(store.clone(), tracker.clone(), events.clone());

        correlator.handle_message(input("m1", "print(1)")).await;
        correlator.handle_message(idle("m1")).await;

        assert!(!store.is_logged_in());
    }

    #[tokio::test]
    async fn test_analysis_emitted_only_for_failed_executions() {
        let events = EventBus::new();
        let analyses = Arc::new(Mutex::new(Vec::new()));
        let analyses_clone = Arc::clone(&analyses);
        let _sub = events.subscribe(move |event| {
            if let AppEvent::AnalysisAvailable { analysis } = event {
                analyses_clone.lock().unwrap().push(analysis.clone());
            }
        });

        let tracker = Arc::new(MockTracker::with_response(Ok(TrackExecutionResponse {
            success: true,
            analysis: Some("you divided by zero".to_string()),
            ..Default::default()
        })));
        let mut correlator =
            ExecutionCorrelator::new(logged_in_store(&events), tracker.clone(), events.clone());

        // Clean execution: analysis in the response is ignored.
        correlator.handle_message(input("m1", "print(1)")).await;
        correlator.handle_message(idle("m1")).await;
        assert!(analyses.lock().unwrap().is_empty());

        // Failed execution: analysis is surfaced.
        correlator.handle_message(input("m2", "1/0")).await;
        correlator
            .handle_message(KernelMessage::Error {
                parent_id: "m2".to_string(),
                ename: "ZeroDivisionError".to_string(),
                evalue: "division by zero".to_string(),
                traceback: vec![],
            })
            .await;
        correlator.handle_message(idle("m2")).await;

        let analyses = analyses.lock().unwrap();
        assert_eq!(analyses.as_slice(), ["you divided by zero"]);
    }

    #[tokio::test]
    async fn test_output_and_error_are_truncated() {
        let events = EventBus::new();
        let tracker = Arc::new(MockTracker::new());
        let mut correlator =
            ExecutionCorrelator::new(logged_in_store(&events), tracker.clone(), events.clone());

        correlator.handle_message(input("m1", "spam()")).await;
        correlator
            .handle_message(KernelMessage::Stream {
                parent_id: "m1".to_string(),
                text: "x".repeat(MAX_OUTPUT_CHARS + 500),
            })
            .await;
        correlator
            .handle_message(KernelMessage::Error {
                parent_id: "m1".to_string(),
                ename: "RuntimeError".to_string(),
                evalue: "y".repeat(MAX_ERROR_CHARS + 500),
                traceback: vec![],
            })
            .await;
        correlator.handle_message(idle("m1")).await;

        let submissions = tracker.submissions();
        assert_eq!(submissions[0].output.chars().count(), MAX_OUTPUT_CHARS);
        assert_eq!(submissions[0].error_output.chars().count(), MAX_ERROR_CHARS);
    }

    #[tokio::test]
    async fn test_result_without_text_adds_nothing() {
        let events = EventBus::new();
        let tracker = Arc::new(MockTracker::new());
        let mut correlator =
            ExecutionCorrelator::new(logged_in_store(&events), tracker.clone(), events.clone());

        correlator.handle_message(input("m1", "fig.show()")).await;
        correlator
            .handle_message(KernelMessage::ExecuteResult {
                parent_id: "m1".to_string(),
                text: None,
            })
            .await;
        correlator.handle_message(idle("m1")).await;

        assert_eq!(tracker.submissions()[0].output, "");
    }
}
