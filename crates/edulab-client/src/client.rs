//! REST client for the Edulab backend.
//!
//! Calls the extension API exposed by the Jupyter server. Non-2xx responses
//! carry a JSON error body; an `error_code` of `NOT_LOGGED_IN` is mapped to
//! an authentication error so callers can force a local logout.

use crate::stream::{self, ChatStreamObserver, SseFrameParser};
use crate::types::{
    ApiErrorBody, ChatRequest, CheckLoginResponse, HealthResponse, LoginRequest, LoginResponse,
    LogoutRequest, ReportResponse,
};
use async_trait::async_trait;
use edulab_core::config::Settings;
use edulab_core::error::{EdulabError, Result};
use edulab_core::tracking::{
    NOT_LOGGED_IN, TrackExecutionRequest, TrackExecutionResponse, TrackingSink,
};
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// HTTP client for every backend endpoint.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    settings: Settings,
}

impl ApiClient {
    pub fn new(settings: Settings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url, path)
    }

    /// Queries backend health and provider configuration.
    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .client
            .get(self.endpoint("health"))
            .timeout(self.settings.request_timeout)
            .send()
            .await?;
        Self::read_json(response).await
    }

    /// Logs a student in; a successful response carries the session token.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let response = self
            .client
            .post(self.endpoint("auth/login"))
            .timeout(self.settings.request_timeout)
            .json(request)
            .send()
            .await?;
        Self::read_json(response).await
    }

    /// Logs a session out on the backend.
    ///
    /// Callers clear local state regardless of the outcome here.
    pub async fn logout(&self, session_id: &str) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("auth/logout"))
            .timeout(self.settings.request_timeout)
            .json(&LogoutRequest {
                session_id: session_id.to_string(),
            })
            .send()
            .await?;
        if !response.status().is_success() {
            debug!(status = %response.status(), "backend logout failed");
        }
        Ok(())
    }

    /// Asks the backend whether a session token is still valid.
    pub async fn check_login(&self, session_id: &str) -> Result<CheckLoginResponse> {
        let response = self
            .client
            .get(self.endpoint("auth/check"))
            .timeout(self.settings.request_timeout)
            .query(&[("session_id", session_id)])
            .send()
            .await?;
        Self::read_json(response).await
    }

    /// Fetches the learning analytics aggregate for a session.
    pub async fn fetch_report(&self, session_id: &str) -> Result<ReportResponse> {
        let response = self
            .client
            .get(self.endpoint("analytics/report"))
            .timeout(self.settings.request_timeout)
            .query(&[("session_id", session_id)])
            .send()
            .await?;
        Self::read_json(response).await
    }

    /// Sends a chat message and streams the reply into the observer.
    ///
    /// The completion callback fires at most once: either on the end-of-stream
    /// sentinel or when the provider closes the connection without one. No
    /// per-request timeout is applied; the body is read until the stream ends.
    pub async fn chat_stream(&self, request: &ChatRequest, observer: &mut dyn ChatStreamObserver) {
        let response = match self
            .client
            .post(self.endpoint("chatgpt/stream"))
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "chat stream request failed");
                observer.on_error(stream::MSG_NETWORK_ERROR);
                return;
            }
        };

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            let parsed: ApiErrorBody = serde_json::from_str(&body).unwrap_or_default();
            if parsed.error_code.as_deref() == Some(NOT_LOGGED_IN) {
                observer.on_error(stream::MSG_NOT_LOGGED_IN);
            } else {
                let message = parsed
                    .error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| {
                        if body.is_empty() {
                            "Chat request failed.".to_string()
                        } else {
                            body
                        }
                    });
                observer.on_error(&message);
            }
            return;
        }

        let mut parser = SseFrameParser::new();
        let mut bytes = response.bytes_stream();
        while let Some(read) = bytes.next().await {
            let chunk = match read {
                Ok(chunk) => chunk,
                Err(err) => {
                    warn!(error = %err, "chat stream read failed");
                    observer.on_error(stream::MSG_NETWORK_ERROR);
                    return;
                }
            };
            if stream::dispatch_frames(parser.push(&chunk), observer) {
                // Sentinel seen; remaining buffered lines are dropped.
                return;
            }
        }
        // Provider closed the connection without a sentinel.
        observer.on_complete();
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Self::map_error_body(status, &body));
        }
        serde_json::from_str(&body).map_err(Into::into)
    }

    fn map_error_body(status: StatusCode, body: &str) -> EdulabError {
        let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .error
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| format!("HTTP {status}"));
        if parsed.error_code.as_deref() == Some(NOT_LOGGED_IN) {
            EdulabError::auth(message)
        } else {
            EdulabError::api(message)
        }
    }
}

#[async_trait]
impl TrackingSink for ApiClient {
    async fn track_execution(
        &self,
        request: &TrackExecutionRequest,
    ) -> Result<TrackExecutionResponse> {
        let response = self
            .client
            .post(self.endpoint("tracking/execution"))
            .timeout(self.settings.request_timeout)
            .json(request)
            .send()
            .await?;
        Self::read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joining() {
        let client = ApiClient::new(Settings::new("http://localhost:8888/edu-extension/api/"));
        assert_eq!(
            client.endpoint("auth/login"),
            "http://localhost:8888/edu-extension/api/auth/login"
        );
    }

    #[test]
    fn test_not_logged_in_maps_to_auth_error() {
        let err = ApiClient::map_error_body(
            StatusCode::UNAUTHORIZED,
            r#"{"success":false,"error":"login first","error_code":"NOT_LOGGED_IN"}"#,
        );
        assert!(err.is_auth());
    }

    #[test]
    fn test_plain_failure_maps_to_api_error() {
        let err = ApiClient::map_error_body(
            StatusCode::SERVICE_UNAVAILABLE,
            r#"{"success":false,"error":"OpenAI API not configured"}"#,
        );
        assert!(matches!(err, EdulabError::Api(ref m) if m.contains("not configured")));
    }

    #[test]
    fn test_unparseable_error_body_uses_status() {
        let err = ApiClient::map_error_body(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert!(matches!(err, EdulabError::Api(ref m) if m.contains("502")));
    }
}
