//! Connection status of the configured runtime endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, StructuredError};

/// Reachability of the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Complete snapshot of what we believe about the runtime.
///
/// Always replaced as a whole; never patched field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// Connected or disconnected.
    #[serde(rename = "status")]
    pub state: ConnectionState,
    /// Endpoint the status refers to.
    pub endpoint: String,
    /// Human-readable diagnostic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Version reported by the runtime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Classification of a disconnect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    /// When the probe ran; `None` until the first refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,
}

impl ConnectionStatus {
    /// Status for an endpoint that has not been probed yet.
    pub fn unchecked(endpoint: impl Into<String>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            endpoint: endpoint.into(),
            message: Some("Connection to the runtime has not been checked yet".to_string()),
            version: None,
            error_code: Some(ErrorCode::ServiceUnavailable),
            checked_at: None,
        }
    }

    pub fn connected(
        endpoint: impl Into<String>,
        version: Option<String>,
        checked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            state: ConnectionState::Connected,
            endpoint: endpoint.into(),
            message: Some("Connected".to_string()),
            version,
            error_code: None,
            checked_at: Some(checked_at),
        }
    }

    pub fn disconnected(
        endpoint: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        checked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            endpoint: endpoint.into(),
            message: Some(message.into()),
            version: None,
            error_code: Some(code),
            checked_at: Some(checked_at),
        }
    }

    pub const fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected)
    }

    /// The error a caller should see when this status blocks an operation.
    ///
    /// The tracker's diagnostic is passed through verbatim.
    pub fn to_error(&self) -> StructuredError {
        let code = self.error_code.unwrap_or(ErrorCode::ServiceUnavailable);
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| format!("Runtime at {} is not reachable", self.endpoint));
        StructuredError::new(code, message).with_details(format!("endpoint: {}", self.endpoint))
    }
}
