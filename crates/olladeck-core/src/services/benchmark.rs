//! Benchmark runner.
//!
//! A benchmark is one generation call timed end to end while a sampler task
//! records host load at a fixed interval. Per model the lifecycle is
//! idle → running → completed | failed; at most one run per model is active.
//!
//! The active set and the results table share one mutex so a record leaves
//! the active set and enters the results in a single critical section. The
//! lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{
    BenchmarkOverview, BenchmarkRecord, BenchmarkState, BenchmarkStatus,
    DEFAULT_BENCHMARK_PROMPT, SystemMetricSample,
};
use crate::error::{ErrorCode, OpResult, StructuredError, require_model_name};
use crate::ports::{Clock, SystemMetricsPort};
use crate::services::model_service::{GenerationStats, ModelService};
use crate::services::tracker::ConnectionTracker;

/// Runner tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkConfig {
    pub sample_interval: Duration,
    pub default_prompt: String,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(1),
            default_prompt: DEFAULT_BENCHMARK_PROMPT.to_string(),
        }
    }
}

#[derive(Default)]
struct Book {
    active: HashMap<String, BenchmarkRecord>,
    results: HashMap<String, BenchmarkRecord>,
}

/// Runs benchmarks and keeps their records. Cheap to clone.
#[derive(Clone)]
pub struct BenchmarkRunner {
    models: Arc<ModelService>,
    tracker: Arc<ConnectionTracker>,
    metrics: Arc<dyn SystemMetricsPort>,
    clock: Arc<dyn Clock>,
    config: BenchmarkConfig,
    book: Arc<Mutex<Book>>,
}

impl BenchmarkRunner {
    pub fn new(
        models: Arc<ModelService>,
        tracker: Arc<ConnectionTracker>,
        metrics: Arc<dyn SystemMetricsPort>,
        clock: Arc<dyn Clock>,
        config: BenchmarkConfig,
    ) -> Self {
        Self {
            models,
            tracker,
            metrics,
            clock,
            config,
            book: Arc::new(Mutex::new(Book::default())),
        }
    }

    /// Run one benchmark to completion and return its frozen record.
    ///
    /// A failed generation still yields `Ok` with `success == false` and the
    /// error attached. The run continues in its own task if the caller stops
    /// waiting, so the model never stays stuck in the active set.
    pub async fn start(&self, model: &str, prompt: Option<&str>) -> OpResult<BenchmarkRecord> {
        let model = require_model_name(model)?.to_string();
        let prompt = prompt
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map_or_else(|| self.config.default_prompt.clone(), ToString::to_string);

        self.register(&model, &prompt)?;
        info!(model = %model, "Benchmark started");

        let runner = self.clone();
        let task_model = model.clone();
        match tokio::spawn(async move { runner.drive(task_model, prompt).await }).await {
            Ok(result) => result,
            Err(e) => {
                let err = StructuredError::unexpected(format!("Benchmark task for {model} failed"))
                    .with_details(e.to_string());
                self.abandon(&model, &err);
                Err(err)
            }
        }
    }

    /// Where a model's benchmark stands.
    pub fn status(&self, model: &str) -> OpResult<BenchmarkStatus> {
        let model = require_model_name(model)?;
        let book = self.book()?;
        if let Some(record) = book.active.get(model) {
            return Ok(BenchmarkStatus::Running {
                model: record.model.clone(),
                started_at: record.started_at,
            });
        }
        book.results.get(model).map_or_else(
            || {
                Err(StructuredError::not_found(format!(
                    "No benchmark data found for model {model}"
                )))
            },
            |record| {
                Ok(BenchmarkStatus::Completed {
                    result: record.clone(),
                })
            },
        )
    }

    /// Every finished record (sorted by model) and the names still running.
    pub fn all_results(&self) -> OpResult<BenchmarkOverview> {
        let book = self.book()?;
        let mut results: Vec<_> = book.results.values().cloned().collect();
        results.sort_by(|a, b| a.model.cmp(&b.model));
        let mut active_benchmarks: Vec<_> = book.active.keys().cloned().collect();
        active_benchmarks.sort();
        Ok(BenchmarkOverview {
            results,
            active_benchmarks,
        })
    }

    fn book(&self) -> OpResult<MutexGuard<'_, Book>> {
        self.book.lock().map_err(|_| {
            StructuredError::new(
                ErrorCode::UnexpectedError,
                "Benchmark bookkeeping is unavailable after an internal failure",
            )
        })
    }

    /// Check preconditions and insert the running record atomically.
    fn register(&self, model: &str, prompt: &str) -> OpResult<()> {
        let mut book = self.book()?;
        if book.active.contains_key(model) {
            return Err(StructuredError::new(
                ErrorCode::AlreadyRunning,
                format!("Benchmark already running for model {model}"),
            ));
        }

        let status = self.tracker.current();
        if !status.is_connected() {
            let diagnostic = status.to_error();
            return Err(StructuredError::new(
                ErrorCode::ServiceUnavailable,
                diagnostic.message,
            )
            .with_details(format!("{} ({})", diagnostic.code, status.endpoint)));
        }

        // A re-run replaces the previous result; the model is never in both.
        book.results.remove(model);
        book.active.insert(
            model.to_string(),
            BenchmarkRecord::started(model, prompt, self.clock.now()),
        );
        Ok(())
    }

    async fn drive(self, model: String, prompt: String) -> OpResult<BenchmarkRecord> {
        let cancel = CancellationToken::new();
        let sampler = tokio::spawn(self.clone().sample_loop(model.clone(), cancel.clone()));

        let timer = Instant::now();
        let outcome = self.models.generate(&model, &prompt).await;
        let elapsed = timer.elapsed().as_secs_f64();

        let finished = self.finish(&model, elapsed, outcome);
        cancel.cancel();
        if let Err(e) = sampler.await {
            warn!(model = %model, error = %e, "Sampler task ended abnormally");
        }

        let record = finished?;
        if record.success {
            info!(
                model = %model,
                elapsed_secs = record.elapsed_secs,
                samples = record.samples.len(),
                tokens_per_second = ?record.tokens_per_second,
                "Benchmark completed"
            );
        } else {
            warn!(
                model = %model,
                error = record.error.as_ref().map(ToString::to_string).unwrap_or_default(),
                "Benchmark failed"
            );
        }
        Ok(record)
    }

    /// Freeze the record and move it from the active set to the results.
    fn finish(
        &self,
        model: &str,
        elapsed_secs: f64,
        outcome: OpResult<GenerationStats>,
    ) -> OpResult<BenchmarkRecord> {
        let completed_at = self.clock.now();
        let mut book = self.book()?;
        let mut record = book.active.remove(model).ok_or_else(|| {
            StructuredError::unexpected(format!("Benchmark record for {model} disappeared"))
        })?;

        record.elapsed_secs = elapsed_secs;
        record.completed_at = Some(completed_at);
        match outcome {
            Ok(stats) => {
                record.state = BenchmarkState::Completed;
                record.success = true;
                record.tokens_generated = stats.eval_count;
                record.tokens_per_second = stats.tokens_per_second();
            }
            Err(err) => {
                record.state = BenchmarkState::Failed;
                record.success = false;
                record.error = Some(err);
            }
        }

        book.results.insert(model.to_string(), record.clone());
        Ok(record)
    }

    /// Move a record whose driver died into the results as failed.
    fn abandon(&self, model: &str, err: &StructuredError) {
        let completed_at = self.clock.now();
        if let Ok(mut book) = self.book()
            && let Some(mut record) = book.active.remove(model)
        {
            record.state = BenchmarkState::Failed;
            record.error = Some(err.clone());
            record.completed_at = Some(completed_at);
            book.results.insert(model.to_string(), record);
        }
    }

    async fn sample_loop(self, model: String, cancel: CancellationToken) {
        loop {
            match self.metrics.sample().await {
                Ok(load) => {
                    if !self.append_sample(&model, load.cpu_percent, load.memory_percent) {
                        break;
                    }
                }
                Err(e) => debug!(model = %model, error = %e, "Skipping load sample"),
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.config.sample_interval) => {}
            }
        }
        debug!(model = %model, "Sampler stopped");
    }

    /// Append while the record is still active and running. Returns whether
    /// sampling should continue.
    fn append_sample(&self, model: &str, cpu_percent: f32, memory_percent: f32) -> bool {
        let Ok(mut book) = self.book() else {
            return false;
        };
        let Some(record) = book.active.get_mut(model) else {
            return false;
        };
        if record.state != BenchmarkState::Running {
            return false;
        }

        // Timestamps never go backwards within a record.
        let now = self.clock.now();
        let timestamp = record
            .samples
            .last()
            .map_or(now, |last| last.timestamp.max(now));
        record.samples.push(SystemMetricSample {
            cpu_percent,
            memory_percent,
            timestamp,
        });
        true
    }
}
