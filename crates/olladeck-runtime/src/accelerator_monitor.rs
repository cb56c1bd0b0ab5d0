//! Accelerator stats stream.
//!
//! Polls an [`AcceleratorProbePort`] on a fixed cadence and yields one
//! timestamped reading per tick. Unlike a health monitor this stream does not
//! deduplicate: consumers chart every point. Missed ticks are skipped rather
//! than bunched up when a probe run overruns the interval.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures_util::Stream;
use olladeck_core::domain::AcceleratorReading;
use olladeck_core::ports::{AcceleratorProbePort, Clock};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default polling cadence.
pub const DEFAULT_ACCELERATOR_INTERVAL: Duration = Duration::from_secs(1);

pub struct AcceleratorMonitor {
    probe: Arc<dyn AcceleratorProbePort>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    cancel_token: CancellationToken,
}

impl AcceleratorMonitor {
    pub fn new(
        probe: Arc<dyn AcceleratorProbePort>,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            probe,
            clock,
            interval: poll_interval,
            cancel_token,
        }
    }

    /// Start polling. The stream is lazy: nothing runs until it is polled.
    ///
    /// It ends when the cancellation token fires; dropping it stops polling
    /// as well.
    pub fn monitor(self) -> impl Stream<Item = AcceleratorReading> {
        let Self {
            probe,
            clock,
            interval: poll_interval,
            cancel_token,
        } = self;

        stream! {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            debug!(interval_ms = poll_interval.as_millis(), "Starting accelerator monitor");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let status = probe.read().await;
                        yield AcceleratorReading {
                            status,
                            timestamp: clock.now(),
                        };
                    }
                    () = cancel_token.cancelled() => {
                        debug!("Accelerator monitor cancelled");
                        break;
                    }
                }
            }
        }
    }
}
