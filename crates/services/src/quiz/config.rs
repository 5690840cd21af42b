use std::time::Duration;

use quiz_core::feedback::ShakeTimeline;
use quiz_core::gesture::GestureConfig;

use crate::http::{ApiConfig, DEFAULT_REQUEST_TIMEOUT};

/// Tunables for one quiz session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Upper bound for each network call; a validation past it counts as wrong.
    pub request_timeout: Duration,
    pub gesture: GestureConfig,
    pub shake: ShakeTimeline,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            gesture: GestureConfig::default(),
            shake: ShakeTimeline::default(),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl From<&ApiConfig> for SessionConfig {
    fn from(api: &ApiConfig) -> Self {
        Self::default().with_request_timeout(api.request_timeout)
    }
}
