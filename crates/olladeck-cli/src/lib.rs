//! `olladeck` command-line front end.
//!
//! Thin adapter over `olladeck_runtime::ControlPanel`: parse arguments,
//! bootstrap the panel, call one operation, print a table or JSON.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary only
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

pub use bootstrap::{CliContext, bootstrap};
pub use commands::{BenchCommand, Commands, EndpointCommand, ModelsCommand};
pub use error::CliError;
pub use parser::Cli;
