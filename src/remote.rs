// Remote inference backend client. Sends raw image bytes to the configured
// endpoint and masks transient backend failures behind a bounded
// retry/backoff loop. Failure classification and backoff timing are pure
// functions so the policy is testable without any network I/O.

use crate::config::ServiceConfig;
use crate::validator::ImageBuffer;
use reqwest::StatusCode;
use reqwest::header;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const USER_AGENT: &str = concat!("superres-server/", env!("CARGO_PKG_VERSION"));

// Response body snippets carried in BackendRejected are capped so a
// misbehaving backend cannot balloon error responses.
const MAX_ERROR_BODY_LEN: usize = 512;

#[derive(Debug)]
pub enum BackendError {
    /// Remote mode requested but no bearer token is configured.
    NotConfigured,
    /// All attempts failed with transient errors.
    Exhausted {
        attempts: u32,
        last_status: Option<u16>,
    },
    /// The backend answered with a non-retryable status.
    Rejected { status: u16, body: String },
    /// 200 response with an empty body.
    EmptyResponse,
    /// Transport failure that is not worth retrying (e.g. a malformed URL).
    Transport(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::NotConfigured => {
                write!(f, "Remote backend is not configured: missing bearer token")
            }
            BackendError::Exhausted {
                attempts,
                last_status,
            } => match last_status {
                Some(status) => write!(
                    f,
                    "Remote backend unavailable after {} attempts (last status {})",
                    attempts, status
                ),
                None => write!(
                    f,
                    "Remote backend unreachable after {} attempts",
                    attempts
                ),
            },
            BackendError::Rejected { status, body } => {
                write!(f, "Remote backend rejected the request ({}): {}", status, body)
            }
            BackendError::EmptyResponse => {
                write!(f, "Remote backend returned an empty response body")
            }
            BackendError::Transport(msg) => write!(f, "Remote backend request failed: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

/// How a failed attempt should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Expected to resolve itself if the call is repeated after a delay:
    /// 503 (model loading), other server-side errors, connect/timeout errors.
    Transient,
    /// Configuration problem; retrying wastes time.
    Terminal,
}

/// Classify a non-200 response status.
pub fn classify_status(status: u16) -> FailureClass {
    match status {
        429 | 500 | 502 | 503 | 504 => FailureClass::Transient,
        _ => FailureClass::Terminal,
    }
}

/// Backoff before the attempt following failed attempt `attempt` (0-based).
///
/// Exponential policy: `2^attempt` seconds (1s, 2s, 4s, ...), matching the
/// model-loading behavior of hosted inference endpoints. Monotonically
/// non-decreasing in `attempt`.
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(16))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { wait: Duration },
    GiveUp,
}

/// Per-call retry bookkeeping. Lives for one remote call sequence and is
/// discarded after success or exhaustion.
#[derive(Debug, Default)]
pub struct RetryState {
    attempts: u32,
    last_status: Option<u16>,
    total_wait: Duration,
}

impl RetryState {
    /// Record a failed attempt and its HTTP status, if one was observed.
    pub fn record_failure(&mut self, status: Option<u16>) {
        self.attempts += 1;
        if status.is_some() {
            self.last_status = status;
        }
    }

    /// Decide whether another attempt should be made after a transient
    /// failure. Pure: depends only on the attempt counter and the limit.
    pub fn decide(&self, max_retries: u32) -> RetryDecision {
        if self.attempts >= max_retries {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry {
                wait: backoff_delay(self.attempts.saturating_sub(1)),
            }
        }
    }

    pub fn note_wait(&mut self, wait: Duration) {
        self.total_wait += wait;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_status(&self) -> Option<u16> {
        self.last_status
    }

    pub fn total_wait(&self) -> Duration {
        self.total_wait
    }
}

// Outcome of a single attempt, before the retry policy is applied.
enum SendOutcome {
    Success(Vec<u8>),
    Empty,
    Transient { status: Option<u16> },
    Rejected { status: u16, body: String },
    Fatal(String),
}

/// HTTP client for the remote upscaling backend.
pub struct RemoteClient {
    http: reqwest::Client,
    config: Arc<ServiceConfig>,
}

impl RemoteClient {
    pub fn new(config: Arc<ServiceConfig>) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(RemoteClient { http, config })
    }

    /// Send the image to the inference backend, retrying transient failures
    /// with exponential backoff up to `max_retries` total attempts.
    pub async fn infer(&self, image: &ImageBuffer) -> Result<Vec<u8>, BackendError> {
        if !self.config.backend_token_configured() {
            return Err(BackendError::NotConfigured);
        }

        let mut state = RetryState::default();
        loop {
            let attempt = state.attempts() + 1;
            info!(
                attempt,
                max_retries = self.config.max_retries,
                "Sending inference request to backend"
            );

            match self.send_once(image).await {
                SendOutcome::Success(body) => {
                    info!(
                        attempt,
                        result_size = body.len(),
                        "Backend inference succeeded"
                    );
                    return Ok(body);
                }
                SendOutcome::Empty => {
                    error!(attempt, "Backend returned 200 with an empty body");
                    return Err(BackendError::EmptyResponse);
                }
                SendOutcome::Rejected { status, body } => {
                    error!(attempt, status, "Backend rejected the request, not retrying");
                    return Err(BackendError::Rejected { status, body });
                }
                SendOutcome::Fatal(msg) => {
                    error!(attempt, error = %msg, "Backend request failed fatally");
                    return Err(BackendError::Transport(msg));
                }
                SendOutcome::Transient { status } => {
                    state.record_failure(status);
                    match state.decide(self.config.max_retries) {
                        RetryDecision::Retry { wait } => {
                            warn!(
                                attempt,
                                status = status.unwrap_or(0),
                                wait_secs = wait.as_secs(),
                                "Transient backend failure, backing off before retry"
                            );
                            state.note_wait(wait);
                            tokio::time::sleep(wait).await;
                        }
                        RetryDecision::GiveUp => {
                            error!(
                                attempts = state.attempts(),
                                last_status = state.last_status().unwrap_or(0),
                                total_wait_secs = state.total_wait().as_secs(),
                                "Backend retries exhausted"
                            );
                            return Err(BackendError::Exhausted {
                                attempts: state.attempts(),
                                last_status: state.last_status(),
                            });
                        }
                    }
                }
            }
        }
    }

    async fn send_once(&self, image: &ImageBuffer) -> SendOutcome {
        let result = self
            .http
            .post(&self.config.backend_url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.backend_token),
            )
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(image.bytes().to_vec())
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status();
                if status == StatusCode::OK {
                    match response.bytes().await {
                        Ok(body) if body.is_empty() => SendOutcome::Empty,
                        Ok(body) => SendOutcome::Success(body.to_vec()),
                        // The connection dropped mid-body; same class as a timeout.
                        Err(_) => SendOutcome::Transient { status: None },
                    }
                } else {
                    match classify_status(status.as_u16()) {
                        FailureClass::Transient => SendOutcome::Transient {
                            status: Some(status.as_u16()),
                        },
                        FailureClass::Terminal => {
                            let mut body = response.text().await.unwrap_or_default();
                            body.truncate(MAX_ERROR_BODY_LEN);
                            SendOutcome::Rejected {
                                status: status.as_u16(),
                                body,
                            }
                        }
                    }
                }
            }
            Err(e) if e.is_connect() || e.is_timeout() => SendOutcome::Transient { status: None },
            Err(e) => SendOutcome::Fatal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_side_errors_are_transient() {
        for status in [429, 500, 502, 503, 504] {
            assert_eq!(classify_status(status), FailureClass::Transient);
        }
    }

    #[test]
    fn client_side_errors_are_terminal() {
        for status in [400, 401, 403, 404, 410, 422] {
            assert_eq!(classify_status(status), FailureClass::Terminal);
        }
    }

    #[test]
    fn backoff_is_exponential_and_monotone() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        let mut previous = Duration::ZERO;
        for attempt in 0..20 {
            let delay = backoff_delay(attempt);
            assert!(delay >= previous);
            previous = delay;
        }
    }

    #[test]
    fn retry_state_allows_exactly_max_retries_attempts() {
        let max_retries = 3;
        let mut state = RetryState::default();

        state.record_failure(Some(503));
        assert_eq!(
            state.decide(max_retries),
            RetryDecision::Retry {
                wait: Duration::from_secs(1)
            }
        );

        state.record_failure(Some(503));
        assert_eq!(
            state.decide(max_retries),
            RetryDecision::Retry {
                wait: Duration::from_secs(2)
            }
        );

        state.record_failure(Some(503));
        assert_eq!(state.decide(max_retries), RetryDecision::GiveUp);
        assert_eq!(state.attempts(), 3);
        assert_eq!(state.last_status(), Some(503));
    }

    #[test]
    fn retry_state_keeps_last_observed_status() {
        let mut state = RetryState::default();
        state.record_failure(Some(503));
        state.record_failure(None); // connection error carries no status
        assert_eq!(state.last_status(), Some(503));
        state.record_failure(Some(500));
        assert_eq!(state.last_status(), Some(500));
    }

    #[test]
    fn cumulative_wait_is_tracked() {
        let mut state = RetryState::default();
        state.note_wait(Duration::from_secs(1));
        state.note_wait(Duration::from_secs(2));
        assert_eq!(state.total_wait(), Duration::from_secs(3));
    }
}
