//! Model listing types produced by the model service.

use serde::{Deserialize, Serialize};

/// An installed model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model name/tag (e.g. "llama2:latest"). Unique within a listing.
    pub name: String,
    /// Size in bytes, 0 when unknown.
    #[serde(default)]
    pub size: u64,
    /// Digest or identifier, empty when unknown.
    #[serde(default)]
    pub digest: String,
    /// Last modification info. Opaque: the CLI reports relative text.
    #[serde(default)]
    pub modified_at: String,
}

impl ModelDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            digest: String::new(),
            modified_at: String::new(),
        }
    }
}

/// A model currently loaded by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningModelDescriptor {
    pub name: String,
    /// Status label; "running" when the source does not report one.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Default status label for running models.
pub const RUNNING_STATUS_LABEL: &str = "running";

impl RunningModelDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: RUNNING_STATUS_LABEL.to_string(),
            instance_id: None,
            size: None,
            expires_at: None,
        }
    }
}

/// Result of a mutating model operation (pull, delete, stop).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub status: String,
    pub message: String,
}

impl ActionOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}
