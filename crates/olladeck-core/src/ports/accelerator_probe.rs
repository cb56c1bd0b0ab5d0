//! Accelerator statistics probe port.
//!
//! Implementations never fail: missing tools, timeouts and bad output are
//! reported through [`AcceleratorStatus`] variants.

use async_trait::async_trait;

use crate::domain::AcceleratorStatus;

#[async_trait]
pub trait AcceleratorProbePort: Send + Sync {
    async fn read(&self) -> AcceleratorStatus;
}
