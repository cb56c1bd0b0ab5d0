//! CLI bootstrap: the composition root.
//!
//! Layers configuration (defaults, `.env`/environment, flags), builds the
//! production `ControlPanel` and establishes the connection status before any
//! handler runs.

use olladeck_core::error::StructuredError;
use olladeck_core::settings::{Settings, SettingsError, SettingsUpdate, validate_settings};
use olladeck_runtime::ControlPanel;
use tracing::debug;

use crate::error::CliError;
use crate::parser::Cli;

/// Composed context handed to every handler.
pub struct CliContext {
    pub panel: ControlPanel,
    /// Print JSON instead of tables.
    pub json: bool,
}

/// Flag values as a partial settings update.
pub fn settings_update(cli: &Cli) -> SettingsUpdate {
    SettingsUpdate {
        endpoint: cli.endpoint.clone().map(Some),
        cli_binary: cli.cli_binary.clone().map(Some),
        retry_attempts: cli.retries.map(Some),
        request_timeout_ms: cli
            .request_timeout
            .map(|secs| Some(secs.saturating_mul(1_000))),
        ..SettingsUpdate::default()
    }
}

/// Settings from the environment with flag overrides applied.
pub fn resolve_settings(cli: &Cli) -> Result<Settings, CliError> {
    apply_overrides(Settings::from_env(), cli)
}

/// Merge the flags into `settings` and validate the result.
///
/// A malformed endpoint is a validation error however it was supplied, so
/// `--endpoint`, `OLLADECK_ENDPOINT` and `OLLAMA_HOST` all exit the same way.
pub fn apply_overrides(mut settings: Settings, cli: &Cli) -> Result<Settings, CliError> {
    settings.merge(&settings_update(cli));
    validate_settings(&settings).map_err(|e| match e {
        SettingsError::InvalidEndpoint(reason) => {
            CliError::Operation(StructuredError::validation(format!("Invalid endpoint: {reason}")))
        }
        other => CliError::Config(other.to_string()),
    })?;
    Ok(settings)
}

/// Build the panel and probe the runtime.
pub async fn bootstrap(cli: &Cli) -> Result<CliContext, CliError> {
    let settings = resolve_settings(cli)?;
    let panel = ControlPanel::from_settings(settings)?;

    let status = panel.refresh_connection().await;
    debug!(
        endpoint = %status.endpoint,
        connected = status.is_connected(),
        "Bootstrap complete"
    );

    Ok(CliContext {
        panel,
        json: cli.json,
    })
}
