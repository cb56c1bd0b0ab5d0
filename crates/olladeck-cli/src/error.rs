//! CLI error type and exit code mapping.

use olladeck_core::error::{ErrorCode, StructuredError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// A panel operation failed.
    #[error("{}", render(.0))]
    Operation(StructuredError),

    /// Bad configuration (settings, environment).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Terminal or serialization failure.
    #[error("IO error: {0}")]
    Io(String),
}

fn render(err: &StructuredError) -> String {
    match &err.details {
        Some(details) => format!("{} [{}]\n  {details}", err.message, err.code),
        None => format!("{} [{}]", err.message, err.code),
    }
}

impl CliError {
    /// Exit codes follow sysexits.h where a category fits.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Operation(err) => match err.code {
                ErrorCode::ValidationError => 2,
                ErrorCode::NotFound => 66, // EX_NOINPUT
                ErrorCode::InstallationError
                | ErrorCode::ServiceNotRunning
                | ErrorCode::ConnectionError
                | ErrorCode::ServiceUnavailable => 69, // EX_UNAVAILABLE
                ErrorCode::UnexpectedError => 70,      // EX_SOFTWARE
                ErrorCode::CommandError => 71,         // EX_OSERR
                ErrorCode::TimeoutError | ErrorCode::AlreadyRunning => 75, // EX_TEMPFAIL
                ErrorCode::HttpError => 76,            // EX_PROTOCOL
            },
            Self::Io(_) => 74,     // EX_IOERR
            Self::Config(_) => 78, // EX_CONFIG
        }
    }
}

impl From<StructuredError> for CliError {
    fn from(err: StructuredError) -> Self {
        Self::Operation(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let validation = CliError::from(StructuredError::validation("Model name cannot be empty"));
        assert_eq!(validation.exit_code(), 2);

        let offline = CliError::from(StructuredError::new(
            ErrorCode::ServiceNotRunning,
            "Ollama is installed but the service is not running",
        ));
        assert_eq!(offline.exit_code(), 69);
        assert_eq!(CliError::Config("bad".into()).exit_code(), 78);
    }

    #[test]
    fn test_message_includes_code_and_details() {
        let err = CliError::from(
            StructuredError::new(ErrorCode::CommandError, "`ollama rm x` exited with code 1")
                .with_details("Error: model 'x' not found"),
        );
        let text = err.to_string();
        assert!(text.contains("COMMAND_ERROR"));
        assert!(text.contains("model 'x' not found"));
    }
}
