//! Domain types.
//!
//! Pure data with serde derives; no I/O.

mod accelerator;
mod benchmark;
mod connection;
mod model;

pub use accelerator::{AcceleratorReading, AcceleratorStats, AcceleratorStatus};
pub use benchmark::{
    AverageMetrics, BenchmarkOverview, BenchmarkRecord, BenchmarkState, BenchmarkStatus,
    DEFAULT_BENCHMARK_PROMPT, SystemMetricSample,
};
pub use connection::{ConnectionState, ConnectionStatus};
pub use model::{ActionOutcome, ModelDescriptor, RUNNING_STATUS_LABEL, RunningModelDescriptor};
