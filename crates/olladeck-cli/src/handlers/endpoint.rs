//! Endpoint command handlers.

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::handlers::status::print_status;
use crate::presentation::print_json;

/// Probe `url` without changing the configured endpoint.
pub async fn check(ctx: &CliContext, url: &str) -> Result<()> {
    let status = ctx
        .panel
        .check_server_endpoint(url)
        .await
        .map_err(CliError::from)?;
    if ctx.json {
        print_json(&status)?;
    } else {
        print_status(&status);
    }
    Ok(())
}
