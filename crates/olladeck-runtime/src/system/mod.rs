//! Host and accelerator probes.
//!
//! `SysinfoMetrics` implements `SystemMetricsPort` for the benchmark sampler;
//! `NvidiaSmiProbe` implements `AcceleratorProbePort` on top of any
//! `CommandRunner`.

mod gpu;
mod host;

pub use gpu::{NVIDIA_SMI, NvidiaSmiProbe, parse_nvidia_smi};
pub use host::SysinfoMetrics;
