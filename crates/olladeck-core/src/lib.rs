//! Core of olladeck: domain types, ports and services for driving a local
//! Ollama runtime.
//!
//! The crate holds no adapter code. HTTP, process spawning, host metrics and
//! the accelerator probe are reached through the traits in [`ports`]; the
//! `olladeck-runtime` crate provides the production implementations.
//!
//! Data flows caller → [`ModelService`] → [`ConnectionTracker`] check →
//! [`RequestExecutor`] (HTTP with retries) → CLI fallback on 404 → normalized
//! result. [`BenchmarkRunner`] wraps one generation call with a load sampler.

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;
pub mod settings;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use domain::{
    AcceleratorReading, AcceleratorStats, AcceleratorStatus, ActionOutcome, AverageMetrics,
    BenchmarkOverview, BenchmarkRecord, BenchmarkState, BenchmarkStatus, ConnectionState,
    ConnectionStatus, DEFAULT_BENCHMARK_PROMPT, ModelDescriptor, RunningModelDescriptor,
    SystemMetricSample,
};
pub use error::{ErrorCode, OpResult, StructuredError, require_model_name};
pub use ports::{
    AcceleratorProbePort, Clock, CommandError, CommandOutput, CommandRunner, CommandSpec,
    HostLoad, HttpMethod, HttpRequest, HttpResponse, HttpTransport, MetricsError,
    SystemClock, SystemMetricsPort, TransportError,
};
pub use services::{
    BenchmarkConfig, BenchmarkRunner, ConnectionTracker, ExecutorError, GenerationStats,
    Installation, ModelService, ModelTimeouts, RequestExecutor, RetryPolicy, TransportProbe,
};
pub use settings::{Settings, SettingsError, SettingsUpdate, validate_settings};
pub use utils::endpoint::{DEFAULT_ENDPOINT, validate_endpoint};
