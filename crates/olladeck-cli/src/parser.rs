//! Root CLI structure with global options.

use clap::Parser;

use crate::commands::Commands;

/// Control panel for a local Ollama runtime.
#[derive(Parser)]
#[command(name = "olladeck")]
#[command(about = "Manage models, benchmarks and GPU stats of a local Ollama runtime")]
#[command(version)]
pub struct Cli {
    /// Ollama endpoint for this invocation
    #[arg(long, global = true, env = "OLLADECK_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Ollama executable used for probing and CLI fallback
    #[arg(long = "cli-binary", global = true, env = "OLLADECK_CLI")]
    pub cli_binary: Option<String>,

    /// HTTP attempts per request before giving up (1-10)
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Per-attempt HTTP timeout in seconds
    #[arg(long = "request-timeout", global = true, value_name = "SECS")]
    pub request_timeout: Option<u64>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
