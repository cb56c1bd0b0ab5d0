//! End-to-end behavior of the composed panel over scripted ports.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use olladeck_core::domain::{BenchmarkState, BenchmarkStatus};
use olladeck_core::error::ErrorCode;
use olladeck_core::ports::{HttpMethod, HttpResponse, TransportError};
use olladeck_core::services::VERSION_PATH;
use olladeck_core::settings::Settings;
use olladeck_core::test_support::{
    FixedAccelerator, FixedMetrics, ScriptedCommands, ScriptedHttp, SteppingClock, TEST_ENDPOINT,
};
use olladeck_runtime::{ControlPanel, PanelPorts};
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;

const CLI_LIST: &str = "\
NAME               ID              SIZE      MODIFIED
llama2:latest      78e26419b446    3.8 GB    2 weeks ago
mistral:7b         61e88e884507    4.1 GB    3 days ago
";

struct Fixture {
    http: Arc<ScriptedHttp>,
    commands: Arc<ScriptedCommands>,
    panel: ControlPanel,
}

fn fast_settings() -> Settings {
    let mut settings = Settings::with_defaults();
    settings.endpoint = Some(TEST_ENDPOINT.to_string());
    settings.retry_delay_ms = Some(1);
    settings.sample_interval_ms = Some(10);
    settings
}

async fn fixture() -> Fixture {
    let http = Arc::new(ScriptedHttp::new());
    let commands = Arc::new(ScriptedCommands::new());
    http.respond(HttpMethod::Get, VERSION_PATH, 200, r#"{"version":"0.5.7"}"#);

    let panel = ControlPanel::with_ports(
        fast_settings(),
        PanelPorts {
            http: http.clone(),
            commands: commands.clone(),
            metrics: Arc::new(FixedMetrics::new(35.0, 60.0)),
            accelerator: Arc::new(FixedAccelerator::healthy()),
            clock: Arc::new(SteppingClock::new(Duration::from_millis(100))),
        },
    )
    .unwrap()
    .with_accelerator_interval(Duration::from_millis(10));

    assert!(panel.refresh_connection().await.is_connected());
    Fixture {
        http,
        commands,
        panel,
    }
}

#[tokio::test]
async fn test_not_found_falls_back_to_cli_listing() {
    let f = fixture().await;
    f.http.respond(HttpMethod::Get, "/api/tags", 404, "404 page not found");
    f.commands.succeed("list", "NAME SIZE\nllama2 3.8GB\n");

    let models = f.panel.list_models().await.unwrap();

    assert_eq!(models.len(), 1);
    assert_eq!(models[0].name, "llama2");
    assert_eq!(f.http.calls_to("/api/tags"), 1);
}

#[tokio::test]
async fn test_running_models_fall_back_to_cli_ps() {
    let f = fixture().await;
    f.http.respond(HttpMethod::Get, "/api/ps", 404, "404 page not found");
    f.commands.succeed(
        "ps",
        "NAME          ID              SIZE      PROCESSOR    UNTIL\nmistral:7b    61e88e884507    4.9 GB    100% GPU     Forever\n",
    );

    let running = assert_ok!(f.panel.list_running_models().await);

    assert_eq!(running.len(), 1);
    assert_eq!(running[0].name, "mistral:7b");
    assert_eq!(running[0].instance_id.as_deref(), Some("61e88e884507"));
    assert_eq!(f.commands.calls_with("ps"), 1);
}

#[tokio::test]
async fn test_http_and_cli_listings_agree_on_names() {
    let over_http = fixture().await;
    over_http.http.respond(
        HttpMethod::Get,
        "/api/tags",
        200,
        r#"{"models":[{"name":"llama2:latest","size":3826793677},{"name":"mistral:7b","size":4109865159}]}"#,
    );

    let over_cli = fixture().await;
    over_cli.http.respond(HttpMethod::Get, "/api/tags", 404, "");
    over_cli.commands.succeed("list", CLI_LIST);

    let names = |models: Vec<olladeck_core::domain::ModelDescriptor>| {
        models.into_iter().map(|m| m.name).collect::<BTreeSet<_>>()
    };
    assert_eq!(
        names(over_http.panel.list_models().await.unwrap()),
        names(over_cli.panel.list_models().await.unwrap())
    );
}

#[tokio::test]
async fn test_three_timeouts_make_three_attempts() {
    let f = fixture().await;
    f.http.on_repeat(HttpMethod::Get, "/api/tags", || {
        Err(TransportError::Timeout("operation timed out".into()))
    });

    let err = f.panel.list_models().await.unwrap_err();

    assert!(matches!(
        err.code,
        ErrorCode::TimeoutError | ErrorCode::ConnectionError
    ));
    assert_eq!(f.http.calls_to("/api/tags"), 3);
    assert_eq!(f.commands.calls_with("list"), 0);
}

#[tokio::test]
async fn test_stop_with_empty_name_touches_nothing() {
    let f = fixture().await;
    let http_before = f.http.total_calls();
    let commands_before = f.commands.total_calls();

    let err = f.panel.stop_model("").await.unwrap_err();

    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(f.http.total_calls(), http_before);
    assert_eq!(f.commands.total_calls(), commands_before);
}

#[tokio::test]
async fn test_invalid_endpoint_leaves_configuration_unchanged() {
    let f = fixture().await;

    let err = f
        .panel
        .set_server_endpoint("localhost:11434")
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::ValidationError);
    let status = f.panel.connection_status();
    assert_eq!(status.endpoint, TEST_ENDPOINT);
    assert!(status.is_connected());
}

#[tokio::test]
async fn test_disconnected_runtime_short_circuits_model_calls() {
    let http = Arc::new(ScriptedHttp::new());
    let commands = Arc::new(ScriptedCommands::new());
    let panel = ControlPanel::with_ports(
        fast_settings(),
        PanelPorts {
            http: http.clone(),
            commands: commands.clone(),
            metrics: Arc::new(FixedMetrics::new(1.0, 1.0)),
            accelerator: Arc::new(FixedAccelerator::healthy()),
            clock: Arc::new(SteppingClock::frozen()),
        },
    )
    .unwrap();

    let status = panel.refresh_connection().await;
    assert_eq!(status.error_code, Some(ErrorCode::InstallationError));
    let probes = http.total_calls();

    let err = panel.list_running_models().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InstallationError);
    assert_eq!(err.message, status.message.unwrap());
    assert_eq!(http.total_calls(), probes);
}

#[tokio::test]
async fn test_second_benchmark_start_is_rejected() {
    let f = fixture().await;
    f.http.set_delay(Duration::from_millis(80));
    f.http.respond(
        HttpMethod::Post,
        "/api/generate",
        200,
        r#"{"done":true,"eval_count":30,"eval_duration":1500000000}"#,
    );
    let panel = Arc::new(f.panel);

    let first = {
        let panel = panel.clone();
        tokio::spawn(async move { panel.start_benchmark("llama2", None).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let err = panel.start_benchmark("llama2", None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::AlreadyRunning);
    assert_eq!(
        panel.all_benchmark_results().unwrap().active_benchmarks,
        ["llama2"]
    );

    let record = first.await.unwrap().unwrap();
    assert_eq!(record.state, BenchmarkState::Completed);
    assert!(
        record
            .samples
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    );
    assert!((record.tokens_per_second.unwrap() - 20.0).abs() < 1e-9);

    let overview = panel.all_benchmark_results().unwrap();
    assert_eq!(overview.results.len(), 1);
    assert!(overview.active_benchmarks.is_empty());
    assert!(matches!(
        panel.benchmark_status("llama2").unwrap(),
        BenchmarkStatus::Completed { .. }
    ));
}

#[tokio::test]
async fn test_unknown_benchmark_is_not_found() {
    let f = fixture().await;
    let err = f.panel.benchmark_status("phi3").unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn test_pull_uses_cli_when_endpoint_missing() {
    let f = fixture().await;
    f.http.on(HttpMethod::Post, "/api/pull", || {
        Ok(HttpResponse::new(404, ""))
    });
    f.commands.succeed("pull", "pulling manifest\nsuccess\n");

    let outcome = f.panel.pull_model("llama2").await.unwrap();

    assert_eq!(outcome.status, "success");
    assert_eq!(f.commands.calls_with("pull"), 1);
}

#[tokio::test]
async fn test_accelerator_stream_is_lazy_and_cancellable() {
    let f = fixture().await;
    let cancel = CancellationToken::new();
    let mut stream = Box::pin(f.panel.stream_accelerator_stats(cancel.clone()));

    let first = stream.next().await.unwrap();
    assert!(first.stats().is_some());

    cancel.cancel();
    let drained = tokio::time::timeout(Duration::from_millis(200), async {
        while stream.next().await.is_some() {}
    })
    .await;
    assert!(drained.is_ok());
}
