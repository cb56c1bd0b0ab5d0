//! Settings domain types and validation.
//!
//! All fields are optional so partial configuration (environment, flags) can
//! be layered; the `effective_*` accessors apply defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::DEFAULT_BENCHMARK_PROMPT;
use crate::utils::endpoint::{DEFAULT_ENDPOINT, validate_endpoint};

/// Default runtime executable name.
pub const DEFAULT_CLI_BINARY: &str = "ollama";

/// Environment variable overriding the endpoint.
pub const ENV_ENDPOINT: &str = "OLLADECK_ENDPOINT";
/// Ollama's own host variable, used when `OLLADECK_ENDPOINT` is unset.
pub const ENV_OLLAMA_HOST: &str = "OLLAMA_HOST";
/// Environment variable overriding the CLI binary.
pub const ENV_CLI_BINARY: &str = "OLLADECK_CLI";

const DEFAULT_INSTALL_CHECK_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_CLI_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_PULL_TIMEOUT_MS: u64 = 3_600_000;
const DEFAULT_GENERATE_TIMEOUT_MS: u64 = 600_000;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;
const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1_000;
const DEFAULT_ACCELERATOR_TIMEOUT_MS: u64 = 5_000;

/// Application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the runtime's HTTP API.
    pub endpoint: Option<String>,
    /// Runtime executable used for probing and CLI fallback.
    pub cli_binary: Option<String>,
    pub install_check_timeout_ms: Option<u64>,
    /// Timeout of the reachability probe.
    pub probe_timeout_ms: Option<u64>,
    /// Per-attempt timeout of ordinary API requests.
    pub request_timeout_ms: Option<u64>,
    /// Timeout of a CLI fallback invocation.
    pub cli_timeout_ms: Option<u64>,
    /// Timeout for pulls (HTTP and CLI), which download whole models.
    pub pull_timeout_ms: Option<u64>,
    /// Timeout of the benchmark generation call.
    pub generate_timeout_ms: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    /// Cadence of the benchmark sampler.
    pub sample_interval_ms: Option<u64>,
    pub accelerator_timeout_ms: Option<u64>,
    pub default_prompt: Option<String>,
}

fn millis(value: Option<u64>, default: u64) -> Duration {
    Duration::from_millis(value.unwrap_or(default))
}

impl Settings {
    /// Create settings with every default filled in.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            endpoint: Some(DEFAULT_ENDPOINT.to_string()),
            cli_binary: Some(DEFAULT_CLI_BINARY.to_string()),
            install_check_timeout_ms: Some(DEFAULT_INSTALL_CHECK_TIMEOUT_MS),
            probe_timeout_ms: Some(DEFAULT_PROBE_TIMEOUT_MS),
            request_timeout_ms: Some(DEFAULT_REQUEST_TIMEOUT_MS),
            cli_timeout_ms: Some(DEFAULT_CLI_TIMEOUT_MS),
            pull_timeout_ms: Some(DEFAULT_PULL_TIMEOUT_MS),
            generate_timeout_ms: Some(DEFAULT_GENERATE_TIMEOUT_MS),
            retry_attempts: Some(DEFAULT_RETRY_ATTEMPTS),
            retry_delay_ms: Some(DEFAULT_RETRY_DELAY_MS),
            sample_interval_ms: Some(DEFAULT_SAMPLE_INTERVAL_MS),
            accelerator_timeout_ms: Some(DEFAULT_ACCELERATOR_TIMEOUT_MS),
            default_prompt: Some(DEFAULT_BENCHMARK_PROMPT.to_string()),
        }
    }

    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup` (environment-shaped).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::with_defaults();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = non_empty(ENV_ENDPOINT) {
            settings.endpoint = Some(endpoint);
        } else if let Some(host) = non_empty(ENV_OLLAMA_HOST) {
            settings.endpoint = Some(normalize_ollama_host(&host));
        }
        if let Some(binary) = non_empty(ENV_CLI_BINARY) {
            settings.cli_binary = Some(binary);
        }
        settings
    }

    pub fn effective_endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn effective_cli_binary(&self) -> &str {
        self.cli_binary.as_deref().unwrap_or(DEFAULT_CLI_BINARY)
    }

    pub fn install_check_timeout(&self) -> Duration {
        millis(self.install_check_timeout_ms, DEFAULT_INSTALL_CHECK_TIMEOUT_MS)
    }

    pub fn probe_timeout(&self) -> Duration {
        millis(self.probe_timeout_ms, DEFAULT_PROBE_TIMEOUT_MS)
    }

    pub fn request_timeout(&self) -> Duration {
        millis(self.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS)
    }

    pub fn cli_timeout(&self) -> Duration {
        millis(self.cli_timeout_ms, DEFAULT_CLI_TIMEOUT_MS)
    }

    pub fn pull_timeout(&self) -> Duration {
        millis(self.pull_timeout_ms, DEFAULT_PULL_TIMEOUT_MS)
    }

    pub fn generate_timeout(&self) -> Duration {
        millis(self.generate_timeout_ms, DEFAULT_GENERATE_TIMEOUT_MS)
    }

    pub fn effective_retry_attempts(&self) -> u32 {
        self.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS)
    }

    pub fn retry_delay(&self) -> Duration {
        millis(self.retry_delay_ms, DEFAULT_RETRY_DELAY_MS)
    }

    pub fn sample_interval(&self) -> Duration {
        millis(self.sample_interval_ms, DEFAULT_SAMPLE_INTERVAL_MS)
    }

    pub fn accelerator_timeout(&self) -> Duration {
        millis(self.accelerator_timeout_ms, DEFAULT_ACCELERATOR_TIMEOUT_MS)
    }

    pub fn effective_default_prompt(&self) -> &str {
        self.default_prompt
            .as_deref()
            .unwrap_or(DEFAULT_BENCHMARK_PROMPT)
    }

    /// Merge another settings into this one, only updating fields that are Some.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(ref endpoint) = other.endpoint {
            self.endpoint.clone_from(endpoint);
        }
        if let Some(ref binary) = other.cli_binary {
            self.cli_binary.clone_from(binary);
        }
        let timeouts = [
            (&mut self.install_check_timeout_ms, other.install_check_timeout_ms),
            (&mut self.probe_timeout_ms, other.probe_timeout_ms),
            (&mut self.request_timeout_ms, other.request_timeout_ms),
            (&mut self.cli_timeout_ms, other.cli_timeout_ms),
            (&mut self.pull_timeout_ms, other.pull_timeout_ms),
            (&mut self.generate_timeout_ms, other.generate_timeout_ms),
            (&mut self.retry_delay_ms, other.retry_delay_ms),
            (&mut self.sample_interval_ms, other.sample_interval_ms),
            (&mut self.accelerator_timeout_ms, other.accelerator_timeout_ms),
        ];
        for (field, update) in timeouts {
            if let Some(value) = update {
                *field = value;
            }
        }
        if let Some(attempts) = other.retry_attempts {
            self.retry_attempts = attempts;
        }
        if let Some(ref prompt) = other.default_prompt {
            self.default_prompt.clone_from(prompt);
        }
    }
}

/// `OLLAMA_HOST` is often given without a scheme (`0.0.0.0:11434`).
fn normalize_ollama_host(host: &str) -> String {
    let host = host.trim();
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

/// Partial settings update.
///
/// Each field is `Option<Option<T>>`:
/// - `None` = don't change this field
/// - `Some(None)` = reset the field to its default
/// - `Some(Some(value))` = set field to value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub endpoint: Option<Option<String>>,
    pub cli_binary: Option<Option<String>>,
    pub install_check_timeout_ms: Option<Option<u64>>,
    pub probe_timeout_ms: Option<Option<u64>>,
    pub request_timeout_ms: Option<Option<u64>>,
    pub cli_timeout_ms: Option<Option<u64>>,
    pub pull_timeout_ms: Option<Option<u64>>,
    pub generate_timeout_ms: Option<Option<u64>>,
    pub retry_attempts: Option<Option<u32>>,
    pub retry_delay_ms: Option<Option<u64>>,
    pub sample_interval_ms: Option<Option<u64>>,
    pub accelerator_timeout_ms: Option<Option<u64>>,
    pub default_prompt: Option<Option<String>>,
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("CLI binary cannot be empty")]
    EmptyCliBinary,

    #[error("Retry attempts must be between 1 and 10, got {0}")]
    InvalidRetryAttempts(u32),

    #[error("{name} must be greater than zero")]
    ZeroDuration { name: &'static str },

    #[error("Default prompt cannot be empty")]
    EmptyPrompt,
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if let Some(endpoint) = settings.endpoint.as_deref() {
        validate_endpoint(endpoint).map_err(|e| SettingsError::InvalidEndpoint(e.message))?;
    }

    if settings
        .cli_binary
        .as_ref()
        .is_some_and(|b| b.trim().is_empty())
    {
        return Err(SettingsError::EmptyCliBinary);
    }

    if let Some(attempts) = settings.retry_attempts {
        if !(1..=10).contains(&attempts) {
            return Err(SettingsError::InvalidRetryAttempts(attempts));
        }
    }

    let durations = [
        ("install_check_timeout_ms", settings.install_check_timeout_ms),
        ("probe_timeout_ms", settings.probe_timeout_ms),
        ("request_timeout_ms", settings.request_timeout_ms),
        ("cli_timeout_ms", settings.cli_timeout_ms),
        ("pull_timeout_ms", settings.pull_timeout_ms),
        ("generate_timeout_ms", settings.generate_timeout_ms),
        ("sample_interval_ms", settings.sample_interval_ms),
        ("accelerator_timeout_ms", settings.accelerator_timeout_ms),
    ];
    if let Some(&(name, _)) = durations.iter().find(|(_, v)| *v == Some(0)) {
        return Err(SettingsError::ZeroDuration { name });
    }

    if settings
        .default_prompt
        .as_ref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(SettingsError::EmptyPrompt);
    }

    Ok(())
}
