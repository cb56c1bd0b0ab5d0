//! Resilient request executor.
//!
//! Issues one logical HTTP call against the configured endpoint with bounded
//! retries. A 404 is never retried: it means the endpoint is not supported and
//! is the only failure class that permits the caller's CLI fallback.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{ErrorCode, StructuredError};
use crate::ports::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError};
use crate::services::tracker::ConnectionTracker;
use crate::utils::endpoint::join_path;

/// Maximum response body kept in error details.
const MAX_DETAIL_CHARS: usize = 512;

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Why a call did not produce a successful response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutorError {
    /// HTTP 404: the runtime does not serve this path.
    #[error("{0}")]
    Unsupported(StructuredError),

    /// Any other failure, already classified.
    #[error("{0}")]
    Failed(StructuredError),
}

impl ExecutorError {
    /// Whether the caller may try the command-line equivalent.
    pub const fn permits_fallback(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    pub fn into_structured(self) -> StructuredError {
        match self {
            Self::Unsupported(e) | Self::Failed(e) => e,
        }
    }

    pub const fn as_structured(&self) -> &StructuredError {
        match self {
            Self::Unsupported(e) | Self::Failed(e) => e,
        }
    }
}

impl From<StructuredError> for ExecutorError {
    fn from(err: StructuredError) -> Self {
        Self::Failed(err)
    }
}

enum AttemptOutcome {
    Done(HttpResponse),
    Fatal(ExecutorError),
    Retry(StructuredError),
}

pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    tracker: Arc<ConnectionTracker>,
    policy: RetryPolicy,
    request_timeout: Duration,
}

impl RequestExecutor {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        tracker: Arc<ConnectionTracker>,
        policy: RetryPolicy,
        request_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            tracker,
            policy,
            request_timeout,
        }
    }

    /// Execute with the default per-attempt timeout.
    pub async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<HttpResponse, ExecutorError> {
        self.execute_with_timeout(method, path, body, self.request_timeout)
            .await
    }

    /// Execute with an explicit per-attempt timeout (pulls, generation).
    pub async fn execute_with_timeout(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
        timeout: Duration,
    ) -> Result<HttpResponse, ExecutorError> {
        let status = self.tracker.current();
        if !status.is_connected() {
            debug!(%method, path, "Runtime disconnected, skipping request");
            return Err(ExecutorError::Failed(status.to_error()));
        }

        let request =
            HttpRequest::new(method, join_path(&status.endpoint, path), timeout).with_body(body);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.attempt(&request, path).await {
                AttemptOutcome::Done(response) => {
                    debug!(%method, path, attempt, status = response.status, "Request succeeded");
                    return Ok(response);
                }
                AttemptOutcome::Fatal(err) => {
                    warn!(%method, path, attempt, error = %err, "Request failed, not retrying");
                    return Err(err);
                }
                AttemptOutcome::Retry(err) => {
                    warn!(
                        %method,
                        path,
                        attempt,
                        max_attempts,
                        error = %err,
                        "Request attempt failed"
                    );
                    last_error = Some(err);
                }
            }
            if attempt < max_attempts {
                sleep(self.policy.delay).await;
            }
        }

        let err = last_error.unwrap_or_else(|| {
            StructuredError::unexpected(format!("{method} {path} made no attempts"))
        });
        Err(ExecutorError::Failed(err))
    }

    async fn attempt(&self, request: &HttpRequest, path: &str) -> AttemptOutcome {
        let method = request.method;
        match self.transport.send(request.clone()).await {
            Ok(response) if response.is_success() => AttemptOutcome::Done(response),
            Ok(response) if response.status == 404 => {
                // Ollama also answers 404 for unknown models; prefer its reason.
                let message = error_field(&response.body).map_or_else(
                    || format!("{method} {path} is not supported by the runtime (HTTP 404)"),
                    |reason| format!("{method} {path} failed with HTTP 404: {reason}"),
                );
                AttemptOutcome::Fatal(ExecutorError::Unsupported(
                    StructuredError::new(ErrorCode::HttpError, message)
                        .with_details(truncate(&response.body)),
                ))
            }
            Ok(response) => {
                let err = StructuredError::new(
                    ErrorCode::HttpError,
                    format!("{method} {path} failed with HTTP {}", response.status),
                )
                .with_details(truncate(&response.body));
                if is_transient_status(response.status) {
                    AttemptOutcome::Retry(err)
                } else {
                    AttemptOutcome::Fatal(ExecutorError::Failed(err))
                }
            }
            Err(TransportError::Timeout(detail)) => AttemptOutcome::Retry(
                StructuredError::new(
                    ErrorCode::TimeoutError,
                    format!(
                        "{method} {path} timed out after {}s",
                        request.timeout.as_secs_f32()
                    ),
                )
                .with_details(detail),
            ),
            Err(TransportError::Connect(detail)) => AttemptOutcome::Retry(
                StructuredError::new(
                    ErrorCode::ConnectionError,
                    format!("Could not connect to the runtime for {method} {path}"),
                )
                .with_details(detail),
            ),
            Err(TransportError::Other(detail)) => AttemptOutcome::Retry(
                StructuredError::new(
                    ErrorCode::ConnectionError,
                    format!("{method} {path} failed in transit"),
                )
                .with_details(detail),
            ),
        }
    }
}

/// Server-side failures are worth another attempt.
const fn is_transient_status(status: u16) -> bool {
    matches!(status, 500..=599)
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= MAX_DETAIL_CHARS {
        body.to_string()
    } else {
        let cut: String = body.chars().take(MAX_DETAIL_CHARS).collect();
        format!("{cut}…")
    }
}

/// The `error` string of an Ollama JSON error body, if there is one.
fn error_field(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string)
}
