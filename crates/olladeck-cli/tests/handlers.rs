//! Handlers driven against a panel wired over scripted ports.

use std::sync::Arc;
use std::time::Duration;

use olladeck_cli::{CliContext, CliError, handlers};
use olladeck_core::error::ErrorCode;
use olladeck_core::ports::HttpMethod;
use olladeck_core::services::VERSION_PATH;
use olladeck_core::settings::Settings;
use olladeck_core::test_support::{
    FixedAccelerator, FixedMetrics, ScriptedCommands, ScriptedHttp, SteppingClock, TEST_ENDPOINT,
};
use olladeck_runtime::{ControlPanel, PanelPorts};
use tokio_test::{assert_err, assert_ok};

async fn context(http: Arc<ScriptedHttp>, commands: Arc<ScriptedCommands>) -> CliContext {
    let mut settings = Settings::with_defaults();
    settings.endpoint = Some(TEST_ENDPOINT.to_string());
    settings.retry_delay_ms = Some(1);
    settings.sample_interval_ms = Some(10);

    let panel = ControlPanel::with_ports(
        settings,
        PanelPorts {
            http,
            commands,
            metrics: Arc::new(FixedMetrics::new(20.0, 40.0)),
            accelerator: Arc::new(FixedAccelerator::healthy()),
            clock: Arc::new(SteppingClock::new(Duration::from_millis(50))),
        },
    )
    .unwrap()
    .with_accelerator_interval(Duration::from_millis(5));
    panel.refresh_connection().await;

    CliContext { panel, json: true }
}

fn exit_code(err: &anyhow::Error) -> Option<i32> {
    err.downcast_ref::<CliError>().map(CliError::exit_code)
}

#[tokio::test]
async fn test_status_fails_when_runtime_missing() {
    let ctx = context(
        Arc::new(ScriptedHttp::new()),
        Arc::new(ScriptedCommands::new()),
    )
    .await;

    let err = handlers::status::execute(&ctx).unwrap_err();

    match err.downcast_ref::<CliError>() {
        Some(CliError::Operation(op)) => assert_eq!(op.code, ErrorCode::InstallationError),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_models_list_prints_over_cli_fallback() {
    let http = Arc::new(ScriptedHttp::new());
    http.respond(HttpMethod::Get, VERSION_PATH, 200, r#"{"version":"0.5.7"}"#);
    http.respond(HttpMethod::Get, "/api/tags", 404, "");
    let commands = Arc::new(ScriptedCommands::new());
    commands.succeed("list", "NAME SIZE\nllama2 3.8GB\n");
    let ctx = context(http, commands.clone()).await;

    assert_ok!(handlers::models::list(&ctx).await);

    assert_eq!(commands.calls_with("list"), 1);
}

#[tokio::test]
async fn test_models_stop_validation_maps_to_usage_exit_code() {
    let http = Arc::new(ScriptedHttp::new());
    http.respond(HttpMethod::Get, VERSION_PATH, 200, r#"{"version":"0.5.7"}"#);
    let ctx = context(http, Arc::new(ScriptedCommands::new())).await;

    let err = assert_err!(handlers::models::stop(&ctx, "  ").await);

    assert_eq!(exit_code(&err), Some(2));
}

#[tokio::test]
async fn test_bench_reports_duplicate_model_as_failure() {
    let http = Arc::new(ScriptedHttp::new());
    http.respond(HttpMethod::Get, VERSION_PATH, 200, r#"{"version":"0.5.7"}"#);
    http.respond(
        HttpMethod::Post,
        "/api/generate",
        200,
        r#"{"done":true,"eval_count":10,"eval_duration":1000000000}"#,
    );
    http.set_delay(Duration::from_millis(40));
    let ctx = context(http, Arc::new(ScriptedCommands::new())).await;

    let models = vec!["llama2".to_string(), "llama2".to_string()];
    let err = handlers::bench::run(&ctx, &models, Some("hi")).await.unwrap_err();

    assert_eq!(exit_code(&err), Some(75));
    let overview = ctx.panel.all_benchmark_results().unwrap();
    assert_eq!(overview.results.len(), 1);
}

#[tokio::test]
async fn test_gpu_stops_after_requested_samples() {
    let http = Arc::new(ScriptedHttp::new());
    let ctx = context(http, Arc::new(ScriptedCommands::new())).await;

    let finished =
        tokio::time::timeout(Duration::from_secs(2), handlers::gpu::execute(&ctx, 3)).await;

    assert!(finished.unwrap().is_ok());
}
