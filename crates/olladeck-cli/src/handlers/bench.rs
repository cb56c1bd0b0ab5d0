//! Benchmark command handler.
//!
//! Runs every requested model concurrently; the runner itself rejects a
//! model named twice with `ALREADY_RUNNING`.

use anyhow::Result;
use futures_util::future::join_all;
use olladeck_core::domain::BenchmarkRecord;
use olladeck_core::error::OpResult;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{print_json, print_separator, truncate_string};

pub async fn run(ctx: &CliContext, models: &[String], prompt: Option<&str>) -> Result<()> {
    let outcomes = join_all(
        models
            .iter()
            .map(|model| ctx.panel.start_benchmark(model, prompt)),
    )
    .await;

    if ctx.json {
        print_json(&ctx.panel.all_benchmark_results().map_err(CliError::from)?)?;
    } else {
        print_summary(models, &outcomes);
    }

    // Surface the first failure through the exit code.
    let first_error = outcomes.into_iter().find_map(|outcome| match outcome {
        Err(err) => Some(err),
        Ok(record) => record.error,
    });
    match first_error {
        Some(err) => Err(CliError::from(err).into()),
        None => Ok(()),
    }
}

fn print_summary(models: &[String], outcomes: &[OpResult<BenchmarkRecord>]) {
    println!(
        "{:<28} {:<10} {:>9} {:>10} {:>7} {:>7} {:>8}",
        "Model", "State", "Elapsed", "Tokens/s", "CPU %", "Mem %", "Samples"
    );
    print_separator(85);
    for (model, outcome) in models.iter().zip(outcomes) {
        match outcome {
            Ok(record) => {
                let avg = record.average_metrics();
                println!(
                    "{:<28} {:<10} {:>8.2}s {:>10} {:>7} {:>7} {:>8}",
                    truncate_string(model, 27),
                    format!("{:?}", record.state).to_lowercase(),
                    record.elapsed_secs,
                    record
                        .tokens_per_second
                        .map_or_else(|| "--".to_string(), |t| format!("{t:.1}")),
                    avg.map_or_else(|| "--".to_string(), |a| format!("{:.1}", a.cpu_percent)),
                    avg.map_or_else(|| "--".to_string(), |a| format!("{:.1}", a.memory_percent)),
                    record.samples.len()
                );
                if let Some(err) = &record.error {
                    println!("  error: {err} [{}]", err.code);
                }
            }
            Err(err) => {
                println!("{:<28} {:<10} {err} [{}]", truncate_string(model, 27), "rejected", err.code);
            }
        }
    }
}
