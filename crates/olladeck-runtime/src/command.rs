//! Command runner built on `tokio::process`.
//!
//! The executable is resolved on `PATH` with `which` first so a missing
//! binary is reported as [`CommandError::NotFound`] rather than a generic
//! spawn failure. The child is killed when its timeout expires.

use std::process::Stdio;

use async_trait::async_trait;
use olladeck_core::ports::{CommandError, CommandOutput, CommandRunner, CommandSpec};
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let program =
            which::which(&spec.program).map_err(|_| CommandError::NotFound(spec.program.clone()))?;

        let mut cmd = Command::new(program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = %spec.display(), timeout_secs = spec.timeout.as_secs(), "Running command");
        let output = match tokio::time::timeout(spec.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| CommandError::Io(e.to_string()))?,
            Err(_) => {
                return Err(CommandError::Timeout {
                    command: spec.display(),
                    seconds: spec.timeout.as_secs(),
                });
            }
        };

        let output = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(command = %spec.display(), exit_code = ?output.exit_code, "Command finished");
        Ok(output)
    }
}
