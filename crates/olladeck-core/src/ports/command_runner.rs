//! Command runner port for the runtime's command-line form.
//!
//! Intent-based: callers describe the program, arguments and timeout; the
//! implementation owns spawning, output capture and killing on timeout.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// A command to run once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }

    /// Rendered for logs and error details.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Captured output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }

    /// Best diagnostic text: stderr, else stdout.
    pub fn diagnostic(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

/// Failures to obtain an exit status at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Executable not found: {0}")]
    NotFound(String),

    #[error("Command `{command}` timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("Failed to run command: {0}")]
    Io(String),
}

/// Port for running external commands.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let spec = CommandSpec::new("ollama", ["stop", "llama2"], Duration::from_secs(10));
        assert_eq!(spec.display(), "ollama stop llama2");
        let bare = CommandSpec::new("ollama", Vec::<String>::new(), Duration::from_secs(1));
        assert_eq!(bare.display(), "ollama");
    }

    #[test]
    fn test_diagnostic_prefers_stderr() {
        let output = CommandOutput {
            exit_code: Some(1),
            stdout: "out".into(),
            stderr: " boom \n".into(),
        };
        assert!(!output.success());
        assert_eq!(output.diagnostic(), "boom");

        let quiet = CommandOutput {
            exit_code: Some(1),
            stdout: "only stdout".into(),
            stderr: String::new(),
        };
        assert_eq!(quiet.diagnostic(), "only stdout");
    }
}
