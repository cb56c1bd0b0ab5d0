//! Core services.
//!
//! Orchestration over the ports: probing, connection tracking, resilient
//! execution with CLI fallback, model management and benchmarking. Nothing
//! here knows which HTTP client or process spawner sits behind a port.

mod benchmark;
mod cli_output;
mod executor;
mod fallback;
mod model_service;
mod probe;
mod tracker;

pub use benchmark::{BenchmarkConfig, BenchmarkRunner};
pub use cli_output::{parse_model_list, parse_running_list};
pub use executor::{ExecutorError, RequestExecutor, RetryPolicy};
pub use fallback::run_with_fallback;
pub use model_service::{GenerationStats, ModelService, ModelTimeouts};
pub use probe::{Installation, TransportProbe, VERSION_PATH};
pub use tracker::ConnectionTracker;
