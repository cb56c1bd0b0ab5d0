//! Adapters for olladeck: the concrete HTTP client, process runner, host
//! metrics and accelerator probe behind the `olladeck-core` ports, plus the
//! accelerator stats stream and the composed [`ControlPanel`].

#![deny(unsafe_code)]

pub mod accelerator_monitor;
mod command;
mod http;
mod panel;
pub mod system;

pub use accelerator_monitor::{AcceleratorMonitor, DEFAULT_ACCELERATOR_INTERVAL};
pub use command::TokioCommandRunner;
pub use http::ReqwestTransport;
pub use panel::{ControlPanel, PanelPorts};
pub use system::{NvidiaSmiProbe, SysinfoMetrics};
