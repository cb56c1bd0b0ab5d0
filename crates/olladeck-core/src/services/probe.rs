//! Transport probe: is the runtime installed, is its API reachable.
//!
//! Pure reads. Nothing here mutates connection state; the tracker owns that.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::ConnectionStatus;
use crate::error::ErrorCode;
use crate::ports::{
    Clock, CommandError, CommandRunner, CommandSpec, HttpMethod, HttpRequest, HttpTransport,
    TransportError,
};
use crate::utils::endpoint::{is_local_endpoint, join_path};

/// Version endpoint of the runtime's HTTP API.
pub const VERSION_PATH: &str = "/api/version";

/// Result of the local installation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Installation {
    Installed { version: Option<String> },
    NotInstalled { reason: String },
}

impl Installation {
    pub const fn is_installed(&self) -> bool {
        matches!(self, Self::Installed { .. })
    }
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: Option<String>,
}

/// Probes installation and reachability with short, independent timeouts.
pub struct TransportProbe {
    http: Arc<dyn HttpTransport>,
    commands: Arc<dyn CommandRunner>,
    clock: Arc<dyn Clock>,
    cli_binary: String,
    install_timeout: Duration,
    probe_timeout: Duration,
}

impl TransportProbe {
    pub fn new(
        http: Arc<dyn HttpTransport>,
        commands: Arc<dyn CommandRunner>,
        clock: Arc<dyn Clock>,
        cli_binary: impl Into<String>,
        install_timeout: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            http,
            commands,
            clock,
            cli_binary: cli_binary.into(),
            install_timeout,
            probe_timeout,
        }
    }

    pub fn cli_binary(&self) -> &str {
        &self.cli_binary
    }

    /// Run `<cli> --version` to see whether the runtime is installed.
    pub async fn check_installed(&self) -> Installation {
        let spec = CommandSpec::new(&self.cli_binary, ["--version"], self.install_timeout);
        match self.commands.run(&spec).await {
            Ok(output) if output.success() => {
                let version = parse_cli_version(&output.stdout);
                debug!(binary = %self.cli_binary, ?version, "Runtime executable found");
                Installation::Installed { version }
            }
            Ok(output) => Installation::NotInstalled {
                reason: format!(
                    "`{}` exited with code {}: {}",
                    spec.display(),
                    output
                        .exit_code
                        .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                    output.diagnostic()
                ),
            },
            Err(CommandError::NotFound(_)) => Installation::NotInstalled {
                reason: format!("`{}` was not found on PATH", self.cli_binary),
            },
            Err(e @ CommandError::Timeout { .. }) => Installation::NotInstalled {
                reason: e.to_string(),
            },
            Err(CommandError::Io(e)) => Installation::NotInstalled {
                reason: format!("`{}` could not be executed: {e}", self.cli_binary),
            },
        }
    }

    /// Issue `GET {endpoint}/api/version` and report the outcome.
    ///
    /// Connection failures are reported as `CONNECTION_ERROR`; [`Self::diagnose`]
    /// refines them with installation information.
    pub async fn check_reachable(&self, endpoint: &str) -> ConnectionStatus {
        let request = HttpRequest::new(
            HttpMethod::Get,
            join_path(endpoint, VERSION_PATH),
            self.probe_timeout,
        );
        let now = self.clock.now();

        match self.http.send(request).await {
            Ok(response) if response.is_success() => {
                let version = serde_json::from_str::<VersionResponse>(&response.body)
                    .ok()
                    .and_then(|v| v.version);
                ConnectionStatus::connected(endpoint, version, now)
            }
            Ok(response) => ConnectionStatus::disconnected(
                endpoint,
                ErrorCode::HttpError,
                format!(
                    "Server at {endpoint} responded with HTTP {}; check that the URL points at an Ollama server",
                    response.status
                ),
                now,
            ),
            Err(TransportError::Timeout(_)) => ConnectionStatus::disconnected(
                endpoint,
                ErrorCode::TimeoutError,
                format!(
                    "Timed out after {}s waiting for {endpoint}",
                    self.probe_timeout.as_secs_f32()
                ),
                now,
            ),
            Err(e) => ConnectionStatus::disconnected(
                endpoint,
                ErrorCode::ConnectionError,
                format!("Could not connect to {endpoint}: {e}"),
                now,
            ),
        }
    }

    /// Reachability and installation checks combined into one status.
    ///
    /// A connection failure becomes:
    /// - `INSTALLATION_ERROR` when the executable is missing,
    /// - `SERVICE_NOT_RUNNING` when it is installed and the endpoint is local,
    /// - `CONNECTION_ERROR` otherwise (unreachable or misconfigured URL).
    pub async fn diagnose(&self, endpoint: &str) -> ConnectionStatus {
        let (reachable, installation) =
            tokio::join!(self.check_reachable(endpoint), self.check_installed());

        if reachable.is_connected() || reachable.error_code != Some(ErrorCode::ConnectionError) {
            return reachable;
        }

        let now = self.clock.now();
        let status = match installation {
            Installation::NotInstalled { reason } => ConnectionStatus::disconnected(
                endpoint,
                ErrorCode::InstallationError,
                format!("Ollama is not installed ({reason}); install it from https://ollama.com"),
                now,
            ),
            Installation::Installed { .. } if is_local_endpoint(endpoint) => {
                ConnectionStatus::disconnected(
                    endpoint,
                    ErrorCode::ServiceNotRunning,
                    format!(
                        "Ollama is installed but the service is not running at {endpoint}; start it with `{} serve`",
                        self.cli_binary
                    ),
                    now,
                )
            }
            Installation::Installed { .. } => ConnectionStatus::disconnected(
                endpoint,
                ErrorCode::ConnectionError,
                format!("Ollama server at {endpoint} is unreachable; check the configured URL"),
                now,
            ),
        };
        warn!(endpoint, code = ?status.error_code, "Runtime is not reachable");
        status
    }
}

/// "ollama version is 0.5.7" -> "0.5.7"
fn parse_cli_version(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find(|line| line.contains("version"))
        .and_then(|line| line.split_whitespace().last())
        .map(ToString::to_string)
}
