//! Benchmark records and system load samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StructuredError;

/// Prompt used when the caller does not provide one.
pub const DEFAULT_BENCHMARK_PROMPT: &str = "Tell me a short story about a robot.";

/// One system load measurement taken while a benchmark runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemMetricSample {
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub timestamp: DateTime<Utc>,
}

/// Lifecycle of a benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchmarkState {
    Running,
    Completed,
    Failed,
}

/// Mean load over a benchmark's samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub cpu_percent: f32,
    pub memory_percent: f32,
}

/// Timed result of one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub model: String,
    pub prompt: String,
    pub state: BenchmarkState,
    pub started_at: DateTime<Utc>,
    /// Wall time of the generation call in seconds.
    pub elapsed_secs: f64,
    /// Samples in capture order.
    pub samples: Vec<SystemMetricSample>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StructuredError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_generated: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_per_second: Option<f64>,
}

impl BenchmarkRecord {
    /// A freshly registered, running record.
    pub fn started(
        model: impl Into<String>,
        prompt: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            state: BenchmarkState::Running,
            started_at,
            elapsed_secs: 0.0,
            samples: Vec::new(),
            success: false,
            error: None,
            completed_at: None,
            tokens_generated: None,
            tokens_per_second: None,
        }
    }

    /// Mean CPU/memory load, or `None` without samples.
    pub fn average_metrics(&self) -> Option<AverageMetrics> {
        if self.samples.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.samples.len() as f32;
        let (cpu, memory) = self
            .samples
            .iter()
            .fold((0.0_f32, 0.0_f32), |(cpu, mem), s| {
                (cpu + s.cpu_percent, mem + s.memory_percent)
            });
        Some(AverageMetrics {
            cpu_percent: cpu / count,
            memory_percent: memory / count,
        })
    }
}

/// Answer to a status query for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BenchmarkStatus {
    Running {
        model: String,
        started_at: DateTime<Utc>,
    },
    Completed {
        result: BenchmarkRecord,
    },
}

/// Every finished record plus the names still running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkOverview {
    pub results: Vec<BenchmarkRecord>,
    pub active_benchmarks: Vec<String>,
}
