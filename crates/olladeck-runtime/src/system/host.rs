//! Host CPU and memory load via `sysinfo`.
//!
//! Refreshing reads `/proc` (or the platform equivalent), so each sample is
//! taken on the blocking pool rather than a runtime worker.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use olladeck_core::ports::{HostLoad, MetricsError, SystemMetricsPort};
use sysinfo::System;

/// Keeps one `System` between samples; CPU usage is computed from the delta
/// between two refreshes, so the very first sample reads close to zero.
pub struct SysinfoMetrics {
    system: Arc<Mutex<System>>,
}

impl SysinfoMetrics {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self {
            system: Arc::new(Mutex::new(system)),
        }
    }
}

impl Default for SysinfoMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn read_load(system: &Mutex<System>) -> Result<HostLoad, MetricsError> {
    let mut system = system
        .lock()
        .map_err(|_| MetricsError("system metrics lock poisoned".to_string()))?;
    system.refresh_cpu_usage();
    system.refresh_memory();

    let total = system.total_memory();
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    let memory_percent = if total == 0 {
        0.0
    } else {
        (system.used_memory() as f64 / total as f64 * 100.0) as f32
    };

    Ok(HostLoad {
        cpu_percent: system.global_cpu_usage(),
        memory_percent,
    })
}

#[async_trait]
impl SystemMetricsPort for SysinfoMetrics {
    async fn sample(&self) -> Result<HostLoad, MetricsError> {
        let system = Arc::clone(&self.system);
        tokio::task::spawn_blocking(move || read_load(&system))
            .await
            .map_err(|e| MetricsError(format!("metrics task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_sample_is_in_range() {
        let metrics = SysinfoMetrics::new();
        let load = assert_ok!(metrics.sample().await);
        assert!((0.0..=100.0).contains(&load.memory_percent));
        assert!(load.memory_percent > 0.0);
        assert!(load.cpu_percent >= 0.0);
    }

    #[test]
    fn test_sample_runs_off_the_async_workers() {
        // The refresh happens on the blocking pool, not the runtime's one thread.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let metrics = SysinfoMetrics::new();
        let load = runtime.block_on(metrics.sample());
        assert_ok!(load);
    }
}
