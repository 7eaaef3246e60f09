//! Client configuration for the Edulab backend.
//!
//! Defaults target a local Jupyter server so the library works out of the
//! box.

use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8888/edu-extension/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings for talking to the Edulab backend.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the extension API, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout applied to non-streaming calls.
    pub request_timeout: Duration,
}

impl Settings {
    /// Creates settings with an explicit base URL and the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

}

impl Default for Settings {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let settings = Settings::new("http://localhost:8888/api/");
        assert_eq!(settings.base_url, "http://localhost:8888/api");
    }
}
