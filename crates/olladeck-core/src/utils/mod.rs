//! Small helpers shared across services.

pub mod endpoint;
