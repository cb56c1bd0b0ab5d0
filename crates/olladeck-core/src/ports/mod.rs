//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the core services expect from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `reqwest`, `tokio::process` or `sysinfo` types in any signature
//! - Intent-based methods (run this command, send this request)
//! - Non-2xx HTTP statuses and non-zero exits are data, not port errors

mod accelerator_probe;
mod clock;
mod command_runner;
mod http_transport;
mod system_metrics;

pub use accelerator_probe::AcceleratorProbePort;
pub use clock::{Clock, SystemClock};
pub use command_runner::{CommandError, CommandOutput, CommandRunner, CommandSpec};
pub use http_transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError};
pub use system_metrics::{HostLoad, MetricsError, SystemMetricsPort};
