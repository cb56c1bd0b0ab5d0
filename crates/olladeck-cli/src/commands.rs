//! Subcommands.

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Show whether the runtime is installed and reachable
    Status,

    /// Inspect candidate endpoints
    Endpoint {
        #[command(subcommand)]
        command: EndpointCommand,
    },

    /// List, pull, remove and stop models
    Models {
        #[command(subcommand)]
        command: ModelsCommand,
    },

    /// Time generation calls while sampling host load
    Bench {
        #[command(subcommand)]
        command: BenchCommand,
    },

    /// Stream GPU utilization readings
    Gpu {
        /// Number of readings to print before exiting
        #[arg(short, long, default_value = "5")]
        samples: usize,
    },
}

#[derive(Subcommand)]
pub enum EndpointCommand {
    /// Probe an endpoint without adopting it
    Check {
        /// Endpoint URL (e.g. "http://localhost:11434")
        url: String,
    },
}

#[derive(Subcommand)]
pub enum ModelsCommand {
    /// List installed models
    List,
    /// List models loaded in memory
    Ps,
    /// Download a model
    Pull {
        /// Model name (e.g. "llama2:7b")
        name: String,
    },
    /// Delete an installed model
    Rm {
        name: String,
    },
    /// Unload a model from memory
    Stop {
        name: String,
    },
}

#[derive(Subcommand)]
pub enum BenchCommand {
    /// Benchmark one or more models concurrently
    Run {
        /// Models to benchmark
        #[arg(required = true)]
        models: Vec<String>,
        /// Prompt sent to every model
        #[arg(short, long)]
        prompt: Option<String>,
    },
}
