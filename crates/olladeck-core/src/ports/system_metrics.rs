//! System load source sampled during benchmarks.

use async_trait::async_trait;
use thiserror::Error;

/// Instantaneous host load, without a timestamp (the caller stamps it).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostLoad {
    pub cpu_percent: f32,
    pub memory_percent: f32,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("System metrics unavailable: {0}")]
pub struct MetricsError(pub String);

/// Port for reading CPU and memory utilization.
#[async_trait]
pub trait SystemMetricsPort: Send + Sync {
    async fn sample(&self) -> Result<HostLoad, MetricsError>;
}
