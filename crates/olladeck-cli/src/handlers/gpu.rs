//! GPU stats handler.
//!
//! Prints readings from the accelerator stream until the requested count is
//! reached or Ctrl-C is pressed.

use anyhow::Result;
use futures_util::StreamExt;
use olladeck_core::domain::{AcceleratorReading, AcceleratorStatus};
use tokio_util::sync::CancellationToken;

use crate::bootstrap::CliContext;
use crate::presentation::print_json;

pub async fn execute(ctx: &CliContext, samples: usize) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut readings = Box::pin(
        ctx.panel
            .stream_accelerator_stats(cancel.clone())
            .take(samples),
    );
    while let Some(reading) = readings.next().await {
        if ctx.json {
            print_json(&reading)?;
        } else {
            print_reading(&reading);
        }
    }

    cancel.cancel();
    interrupt.abort();
    Ok(())
}

fn print_reading(reading: &AcceleratorReading) {
    let at = reading.timestamp.format("%H:%M:%S");
    match &reading.status {
        AcceleratorStatus::Ok(stats) => println!(
            "{at}  util {:>5.1}%  mem {:>7.0}/{:<7.0} MiB ({:>4.1}%)  temp {:>4.1}°C",
            stats.utilization_percent,
            stats.memory_used_mib,
            stats.memory_total_mib,
            stats.memory_percent(),
            stats.temperature_c
        ),
        AcceleratorStatus::Unavailable { reason } => println!("{at}  unavailable: {reason}"),
        AcceleratorStatus::Error { message } => println!("{at}  error: {message}"),
        AcceleratorStatus::Timeout { seconds } => {
            println!("{at}  probe timed out after {seconds}s");
        }
    }
}
