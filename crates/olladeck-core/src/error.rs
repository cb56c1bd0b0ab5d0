//! Structured error payload shared by every boundary-facing operation.
//!
//! Adapters map [`StructuredError`] to their own surface (exit codes, HTTP
//! status codes, JSON bodies). The [`ErrorCode`] is stable and meant for
//! programmatic branching; the message is meant for direct display.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type returned by every public operation.
pub type OpResult<T> = Result<T, StructuredError>;

/// Symbolic error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad or missing input (empty model name, malformed endpoint URI).
    ValidationError,
    /// The runtime executable is not installed.
    InstallationError,
    /// The runtime is installed but its service is not answering.
    ServiceNotRunning,
    /// The endpoint could not be reached.
    ConnectionError,
    /// A request or command exceeded its timeout.
    TimeoutError,
    /// The runtime answered with a non-404 HTTP failure.
    HttpError,
    /// The command-line fallback exited unsuccessfully.
    CommandError,
    /// A benchmark is already active for the model.
    AlreadyRunning,
    /// No data exists for the requested key.
    NotFound,
    /// The runtime is currently believed to be unreachable.
    ServiceUnavailable,
    /// Anything uncategorized.
    UnexpectedError,
}

impl ErrorCode {
    /// The wire name of the code (e.g. `TIMEOUT_ERROR`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InstallationError => "INSTALLATION_ERROR",
            Self::ServiceNotRunning => "SERVICE_NOT_RUNNING",
            Self::ConnectionError => "CONNECTION_ERROR",
            Self::TimeoutError => "TIMEOUT_ERROR",
            Self::HttpError => "HTTP_ERROR",
            Self::CommandError => "COMMAND_ERROR",
            Self::AlreadyRunning => "ALREADY_RUNNING",
            Self::NotFound => "NOT_FOUND",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::UnexpectedError => "UNEXPECTED_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The uniform error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct StructuredError {
    /// User-facing description.
    pub message: String,
    /// Stable machine-readable code.
    pub code: ErrorCode,
    /// Optional diagnostic (stderr, response body, underlying error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl StructuredError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            details: None,
        }
    }

    /// Attach a diagnostic string.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into();
        if !details.trim().is_empty() {
            self.details = Some(details);
        }
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnexpectedError, message)
    }
}

/// Reject empty or whitespace-only model names before any I/O happens.
pub fn require_model_name(name: &str) -> OpResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StructuredError::validation("Model name cannot be empty"));
    }
    Ok(trimmed)
}
