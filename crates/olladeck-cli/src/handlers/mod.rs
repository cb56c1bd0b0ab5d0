//! Command handlers.
//!
//! Each handler is a thin wrapper: call one `ControlPanel` operation, map its
//! error into [`crate::CliError`], print a table or JSON.

pub mod bench;
pub mod endpoint;
pub mod gpu;
pub mod models;
pub mod status;
