//! Shared CLI presentation utilities.
//!
//! Format-only helpers; no domain logic.

pub mod tables;

pub use tables::{format_bytes, format_optional, print_json, print_separator, truncate_string};
