//! Scripted port implementations for tests.
//!
//! Available to this crate's unit tests and, through the `test-utils`
//! feature, to integration tests of downstream crates.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::domain::{AcceleratorStats, AcceleratorStatus};
use crate::ports::{
    AcceleratorProbePort, Clock, CommandError, CommandOutput, CommandRunner, CommandSpec,
    HostLoad, HttpMethod, HttpRequest, HttpResponse, HttpTransport, MetricsError,
    SystemMetricsPort, TransportError,
};
use crate::services::{ConnectionTracker, TransportProbe, VERSION_PATH};

/// Endpoint used by the scripted fixtures.
pub const TEST_ENDPOINT: &str = "http://localhost:11434";

type HttpReply = Arc<dyn Fn() -> Result<HttpResponse, TransportError> + Send + Sync>;
type CommandReply = Arc<dyn Fn() -> Result<CommandOutput, CommandError> + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Route<R> {
    once: VecDeque<R>,
    repeat: Option<R>,
}

impl<R> Default for Route<R> {
    fn default() -> Self {
        Self {
            once: VecDeque::new(),
            repeat: None,
        }
    }
}

impl<R: Clone> Route<R> {
    fn next(&mut self) -> Option<R> {
        self.once.pop_front().or_else(|| self.repeat.clone())
    }
}

/// HTTP transport answering from per-route scripts.
///
/// Routes are matched on method and URL suffix. One-shot replies are consumed
/// in order before the repeating reply is used. Unscripted routes fail with a
/// connection error.
#[derive(Default)]
pub struct ScriptedHttp {
    routes: Mutex<HashMap<(HttpMethod, String), Route<HttpReply>>>,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply used once.
    pub fn on<F>(&self, method: HttpMethod, path: &str, reply: F)
    where
        F: Fn() -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        lock(&self.routes)
            .entry((method, path.to_string()))
            .or_insert_with(Route::default)
            .once
            .push_back(Arc::new(reply));
    }

    /// Set the reply used whenever no one-shot reply is queued.
    pub fn on_repeat<F>(&self, method: HttpMethod, path: &str, reply: F)
    where
        F: Fn() -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        lock(&self.routes)
            .entry((method, path.to_string()))
            .or_insert_with(Route::default)
            .repeat = Some(Arc::new(reply));
    }

    /// Shorthand for a repeating reply with a status and body.
    pub fn respond(&self, method: HttpMethod, path: &str, status: u16, body: &str) {
        let body = body.to_string();
        self.on_repeat(method, path, move || Ok(HttpResponse::new(status, body.clone())));
    }

    /// Delay every reply (to exercise concurrent callers).
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = Some(delay);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|r| r.url.ends_with(path))
            .count()
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.requests).len()
    }

    fn reply_for(&self, request: &HttpRequest) -> Option<HttpReply> {
        let mut routes = lock(&self.routes);
        routes
            .iter_mut()
            .find(|((method, path), _)| *method == request.method && request.url.ends_with(path))
            .and_then(|(_, route)| route.next())
    }
}

#[async_trait]
impl HttpTransport for ScriptedHttp {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        lock(&self.requests).push(request.clone());
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.reply_for(&request) {
            Some(reply) => reply(),
            None => Err(TransportError::Connect(format!(
                "no script for {} {}",
                request.method, request.url
            ))),
        }
    }
}

/// Command runner answering from scripts keyed by the first argument.
///
/// Unscripted commands fail with [`CommandError::NotFound`].
#[derive(Default)]
pub struct ScriptedCommands {
    routes: Mutex<HashMap<String, Route<CommandReply>>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_repeat<F>(&self, subcommand: &str, reply: F)
    where
        F: Fn() -> Result<CommandOutput, CommandError> + Send + Sync + 'static,
    {
        lock(&self.routes)
            .entry(subcommand.to_string())
            .or_insert_with(Route::default)
            .repeat = Some(Arc::new(reply));
    }

    /// Repeating reply with exit code 0 and the given stdout.
    pub fn succeed(&self, subcommand: &str, stdout: &str) {
        let stdout = stdout.to_string();
        self.on_repeat(subcommand, move || {
            Ok(CommandOutput {
                exit_code: Some(0),
                stdout: stdout.clone(),
                stderr: String::new(),
            })
        });
    }

    /// Repeating reply with a non-zero exit code and the given stderr.
    pub fn fail(&self, subcommand: &str, exit_code: i32, stderr: &str) {
        let stderr = stderr.to_string();
        self.on_repeat(subcommand, move || {
            Ok(CommandOutput {
                exit_code: Some(exit_code),
                stdout: String::new(),
                stderr: stderr.clone(),
            })
        });
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        lock(&self.calls).clone()
    }

    pub fn calls_with(&self, subcommand: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|spec| spec.args.first().is_some_and(|a| a == subcommand))
            .count()
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl CommandRunner for ScriptedCommands {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        lock(&self.calls).push(spec.clone());
        let key = spec.args.first().cloned().unwrap_or_default();
        let reply = lock(&self.routes).get_mut(&key).and_then(Route::next);
        match reply {
            Some(reply) => reply(),
            None => Err(CommandError::NotFound(spec.program.clone())),
        }
    }
}

/// Host metrics that return a fixed load, or fail when configured to.
pub struct FixedMetrics {
    load: Mutex<Result<HostLoad, MetricsError>>,
    samples: AtomicUsize,
}

impl FixedMetrics {
    pub fn new(cpu_percent: f32, memory_percent: f32) -> Self {
        Self {
            load: Mutex::new(Ok(HostLoad {
                cpu_percent,
                memory_percent,
            })),
            samples: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            load: Mutex::new(Err(MetricsError(reason.to_string()))),
            samples: AtomicUsize::new(0),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SystemMetricsPort for FixedMetrics {
    async fn sample(&self) -> Result<HostLoad, MetricsError> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        lock(&self.load).clone()
    }
}

/// Accelerator probe returning a fixed status.
pub struct FixedAccelerator(pub AcceleratorStatus);

impl FixedAccelerator {
    pub const fn healthy() -> Self {
        Self(AcceleratorStatus::Ok(AcceleratorStats {
            utilization_percent: 42.0,
            memory_used_mib: 2048.0,
            memory_total_mib: 8192.0,
            temperature_c: 61.0,
        }))
    }
}

#[async_trait]
impl AcceleratorProbePort for FixedAccelerator {
    async fn read(&self) -> AcceleratorStatus {
        self.0.clone()
    }
}

/// Clock that advances one step on every read.
pub struct SteppingClock {
    base: DateTime<Utc>,
    step_ms: i64,
    reads: AtomicI64,
}

impl SteppingClock {
    pub fn new(step: Duration) -> Self {
        Self {
            base: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).single().unwrap_or_default(),
            step_ms: i64::try_from(step.as_millis()).unwrap_or(i64::MAX),
            reads: AtomicI64::new(0),
        }
    }

    /// A clock that never moves.
    pub fn frozen() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        self.base + chrono::Duration::milliseconds(n.saturating_mul(self.step_ms))
    }
}

/// Probe wired to the scripted transport and an empty command runner.
pub fn probe_for(http: &Arc<ScriptedHttp>, commands: &Arc<ScriptedCommands>) -> Arc<TransportProbe> {
    Arc::new(TransportProbe::new(
        http.clone(),
        commands.clone(),
        Arc::new(SteppingClock::frozen()),
        "ollama",
        Duration::from_secs(1),
        Duration::from_secs(1),
    ))
}

/// Tracker for [`TEST_ENDPOINT`] that has never been refreshed.
pub fn unchecked_tracker(http: &Arc<ScriptedHttp>) -> Arc<ConnectionTracker> {
    let commands = Arc::new(ScriptedCommands::new());
    Arc::new(ConnectionTracker::new(
        probe_for(http, &commands),
        TEST_ENDPOINT,
    ))
}

/// Tracker already marked connected through a scripted version probe.
pub async fn connected_tracker(http: &Arc<ScriptedHttp>) -> Arc<ConnectionTracker> {
    http.respond(HttpMethod::Get, VERSION_PATH, 200, r#"{"version":"0.5.7"}"#);
    let tracker = unchecked_tracker(http);
    tracker.refresh().await;
    tracker
}
