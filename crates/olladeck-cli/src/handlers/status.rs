//! Status command handler.

use anyhow::Result;
use olladeck_core::domain::ConnectionStatus;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::print_json;

pub fn execute(ctx: &CliContext) -> Result<()> {
    let status = ctx.panel.connection_status();
    if ctx.json {
        print_json(&status)?;
    } else {
        print_status(&status);
    }
    if status.is_connected() {
        Ok(())
    } else {
        Err(CliError::from(status.to_error()).into())
    }
}

/// Human-readable connection summary, shared with `endpoint check`.
pub fn print_status(status: &ConnectionStatus) {
    if status.is_connected() {
        println!(
            "Connected to {} (Ollama {})",
            status.endpoint,
            status.version.as_deref().unwrap_or("unknown version")
        );
    } else {
        println!("Not connected to {}", status.endpoint);
        if let Some(code) = status.error_code {
            println!("  code:    {code}");
        }
        if let Some(message) = &status.message {
            println!("  reason:  {message}");
        }
    }
}
