//! `ControlPanel`: the composed operation surface.
//!
//! Built once from [`Settings`] and a set of ports. Front ends (the CLI, a
//! web layer) hold one panel and call its methods; nothing else needs to
//! know how the services are wired.

use std::sync::Arc;
use std::time::Duration;

use futures_util::Stream;
use olladeck_core::domain::{
    AcceleratorReading, ActionOutcome, BenchmarkOverview, BenchmarkRecord, BenchmarkStatus,
    ConnectionStatus, ModelDescriptor, RunningModelDescriptor,
};
use olladeck_core::error::{OpResult, StructuredError};
use olladeck_core::ports::{
    AcceleratorProbePort, Clock, CommandRunner, HttpTransport, SystemClock, SystemMetricsPort,
};
use olladeck_core::services::{
    BenchmarkConfig, BenchmarkRunner, ConnectionTracker, ModelService, ModelTimeouts,
    RequestExecutor, RetryPolicy, TransportProbe,
};
use olladeck_core::settings::{Settings, validate_settings};
use olladeck_core::utils::endpoint::validate_endpoint;
use tokio_util::sync::CancellationToken;

use crate::accelerator_monitor::{AcceleratorMonitor, DEFAULT_ACCELERATOR_INTERVAL};
use crate::command::TokioCommandRunner;
use crate::http::ReqwestTransport;
use crate::system::{NvidiaSmiProbe, SysinfoMetrics};

/// The injectable ports behind a panel.
#[derive(Clone)]
pub struct PanelPorts {
    pub http: Arc<dyn HttpTransport>,
    pub commands: Arc<dyn CommandRunner>,
    pub metrics: Arc<dyn SystemMetricsPort>,
    pub accelerator: Arc<dyn AcceleratorProbePort>,
    pub clock: Arc<dyn Clock>,
}

pub struct ControlPanel {
    settings: Settings,
    tracker: Arc<ConnectionTracker>,
    models: Arc<ModelService>,
    benchmarks: BenchmarkRunner,
    accelerator: Arc<dyn AcceleratorProbePort>,
    clock: Arc<dyn Clock>,
    accelerator_interval: Duration,
}

impl ControlPanel {
    /// Production wiring: reqwest, tokio processes, sysinfo and nvidia-smi.
    pub fn from_settings(settings: Settings) -> OpResult<Self> {
        let http = ReqwestTransport::new().map_err(|e| {
            StructuredError::unexpected("Failed to build HTTP client").with_details(e.to_string())
        })?;
        let commands: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner::new());
        let ports = PanelPorts {
            http: Arc::new(http),
            commands: commands.clone(),
            metrics: Arc::new(SysinfoMetrics::new()),
            accelerator: Arc::new(NvidiaSmiProbe::new(
                commands,
                settings.accelerator_timeout(),
            )),
            clock: Arc::new(SystemClock),
        };
        Self::with_ports(settings, ports)
    }

    /// Wire the services over caller-provided ports.
    ///
    /// The connection starts out disconnected; call
    /// [`Self::refresh_connection`] before issuing model operations.
    pub fn with_ports(settings: Settings, ports: PanelPorts) -> OpResult<Self> {
        validate_settings(&settings).map_err(|e| StructuredError::validation(e.to_string()))?;
        let endpoint = validate_endpoint(settings.effective_endpoint())?;
        let cli_binary = settings.effective_cli_binary().to_string();

        let probe = Arc::new(TransportProbe::new(
            ports.http.clone(),
            ports.commands.clone(),
            ports.clock.clone(),
            cli_binary.clone(),
            settings.install_check_timeout(),
            settings.probe_timeout(),
        ));
        let tracker = Arc::new(ConnectionTracker::new(probe, endpoint));
        let executor = Arc::new(RequestExecutor::new(
            ports.http,
            tracker.clone(),
            RetryPolicy {
                max_attempts: settings.effective_retry_attempts(),
                delay: settings.retry_delay(),
            },
            settings.request_timeout(),
        ));
        let models = Arc::new(ModelService::new(
            executor,
            ports.commands,
            cli_binary,
            ModelTimeouts {
                cli: settings.cli_timeout(),
                pull: settings.pull_timeout(),
                generate: settings.generate_timeout(),
            },
        ));
        let benchmarks = BenchmarkRunner::new(
            models.clone(),
            tracker.clone(),
            ports.metrics,
            ports.clock.clone(),
            BenchmarkConfig {
                sample_interval: settings.sample_interval(),
                default_prompt: settings.effective_default_prompt().to_string(),
            },
        );

        Ok(Self {
            settings,
            tracker,
            models,
            benchmarks,
            accelerator: ports.accelerator,
            clock: ports.clock,
            accelerator_interval: DEFAULT_ACCELERATOR_INTERVAL,
        })
    }

    /// Override the accelerator polling cadence.
    #[must_use]
    pub const fn with_accelerator_interval(mut self, interval: Duration) -> Self {
        self.accelerator_interval = interval;
        self
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.tracker.current()
    }

    pub async fn refresh_connection(&self) -> ConnectionStatus {
        self.tracker.refresh().await
    }

    /// Validate, adopt and probe a new endpoint.
    pub async fn set_server_endpoint(&self, uri: &str) -> OpResult<ConnectionStatus> {
        self.tracker.set_endpoint(uri).await
    }

    /// Validate and probe an endpoint without adopting it.
    pub async fn check_server_endpoint(&self, uri: &str) -> OpResult<ConnectionStatus> {
        self.tracker.check_endpoint(uri).await
    }

    pub async fn list_models(&self) -> OpResult<Vec<ModelDescriptor>> {
        self.models.list_models().await
    }

    pub async fn list_running_models(&self) -> OpResult<Vec<RunningModelDescriptor>> {
        self.models.list_running_models().await
    }

    pub async fn pull_model(&self, name: &str) -> OpResult<ActionOutcome> {
        self.models.pull_model(name).await
    }

    pub async fn delete_model(&self, name: &str) -> OpResult<ActionOutcome> {
        self.models.delete_model(name).await
    }

    pub async fn stop_model(&self, name: &str) -> OpResult<ActionOutcome> {
        self.models.stop_model(name).await
    }

    /// Run a benchmark; `None` uses the configured default prompt.
    pub async fn start_benchmark(
        &self,
        model: &str,
        prompt: Option<&str>,
    ) -> OpResult<BenchmarkRecord> {
        self.benchmarks.start(model, prompt).await
    }

    pub fn benchmark_status(&self, model: &str) -> OpResult<BenchmarkStatus> {
        self.benchmarks.status(model)
    }

    pub fn all_benchmark_results(&self) -> OpResult<BenchmarkOverview> {
        self.benchmarks.all_results()
    }

    /// Lazy, infinite stream of accelerator readings, one per tick.
    pub fn stream_accelerator_stats(
        &self,
        cancel_token: CancellationToken,
    ) -> impl Stream<Item = AcceleratorReading> + use<> {
        AcceleratorMonitor::new(
            self.accelerator.clone(),
            self.clock.clone(),
            self.accelerator_interval,
            cancel_token,
        )
        .monitor()
    }
}
