//! Endpoint URI validation.

use url::Url;

use crate::error::{OpResult, StructuredError};

/// Default Ollama endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Validate an endpoint URI and return its normalized form.
///
/// The scheme must be `http` or `https` and a host must be present. The
/// trailing slash is removed so paths can be appended directly.
///
/// ```rust
/// use olladeck_core::utils::endpoint::validate_endpoint;
///
/// assert_eq!(
///     validate_endpoint("http://localhost:11434/").unwrap(),
///     "http://localhost:11434"
/// );
/// assert!(validate_endpoint("localhost:11434").is_err());
/// ```
pub fn validate_endpoint(raw: &str) -> OpResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(StructuredError::validation("Server URL cannot be empty"));
    }

    let url = Url::parse(trimmed).map_err(|e| {
        StructuredError::validation(format!("Invalid server URL: {trimmed}"))
            .with_details(e.to_string())
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(StructuredError::validation(format!(
            "Server URL must start with http:// or https:// (got {trimmed})"
        )));
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(StructuredError::validation(format!(
            "Server URL has no host: {trimmed}"
        )));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Whether the endpoint points at this machine.
///
/// Used to tell "installed but not running" apart from "unreachable".
pub fn is_local_endpoint(endpoint: &str) -> bool {
    Url::parse(endpoint)
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| {
            matches!(
                host.as_str(),
                "localhost" | "127.0.0.1" | "[::1]" | "::1" | "0.0.0.0"
            )
        })
}

/// Join an endpoint and an absolute API path.
pub fn join_path(endpoint: &str, path: &str) -> String {
    format!(
        "{}/{}",
        endpoint.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
