//! Model management facade.
//!
//! Every operation goes through the [`RequestExecutor`] first and falls back
//! to the runtime's command line only when the HTTP endpoint is unsupported.
//! Both legs are normalized into the same descriptor types.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::domain::{ActionOutcome, ModelDescriptor, RUNNING_STATUS_LABEL, RunningModelDescriptor};
use crate::error::{ErrorCode, OpResult, StructuredError, require_model_name};
use crate::ports::{CommandError, CommandOutput, CommandRunner, CommandSpec, HttpMethod, HttpResponse};
use crate::services::cli_output::{parse_model_list, parse_running_list};
use crate::services::executor::{ExecutorError, RequestExecutor};
use crate::services::fallback::run_with_fallback;

const TAGS_PATH: &str = "/api/tags";
const PS_PATH: &str = "/api/ps";
const PULL_PATH: &str = "/api/pull";
const DELETE_PATH: &str = "/api/delete";
const GENERATE_PATH: &str = "/api/generate";

/// Timeouts for the slower operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelTimeouts {
    /// Single CLI fallback invocation.
    pub cli: Duration,
    /// Pulls over both legs.
    pub pull: Duration,
    /// One generation call.
    pub generate: Duration,
}

impl Default for ModelTimeouts {
    fn default() -> Self {
        Self {
            cli: Duration::from_secs(10),
            pull: Duration::from_secs(3600),
            generate: Duration::from_secs(600),
        }
    }
}

/// Counters reported by a non-streaming generation call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct GenerationStats {
    /// Tokens produced.
    #[serde(default)]
    pub eval_count: Option<u64>,
    /// Time spent producing them, in nanoseconds.
    #[serde(default)]
    pub eval_duration: Option<u64>,
}

impl GenerationStats {
    pub fn tokens_per_second(&self) -> Option<f64> {
        match (self.eval_count, self.eval_duration) {
            (Some(count), Some(nanos)) if nanos > 0 => {
                #[allow(clippy::cast_precision_loss)]
                let rate = count as f64 / (nanos as f64 / 1e9);
                Some(rate)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Wrapped { models: Vec<T> },
    Bare(Vec<T>),
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Wrapped { models } | Self::Bare(models) => models,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireModel {
    name: Option<String>,
    model: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    digest: Option<String>,
    #[serde(default)]
    modified_at: Option<String>,
    #[serde(default)]
    expires_at: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl WireModel {
    fn name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(self.model.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// Unified model operations over HTTP with CLI fallback.
pub struct ModelService {
    executor: Arc<RequestExecutor>,
    commands: Arc<dyn CommandRunner>,
    cli_binary: String,
    timeouts: ModelTimeouts,
}

impl ModelService {
    pub fn new(
        executor: Arc<RequestExecutor>,
        commands: Arc<dyn CommandRunner>,
        cli_binary: impl Into<String>,
        timeouts: ModelTimeouts,
    ) -> Self {
        Self {
            executor,
            commands,
            cli_binary: cli_binary.into(),
            timeouts,
        }
    }

    /// Installed models. An empty installation yields an empty list.
    pub async fn list_models(&self) -> OpResult<Vec<ModelDescriptor>> {
        run_with_fallback(
            "list_models",
            async {
                let response = self.executor.execute(HttpMethod::Get, TAGS_PATH, None).await?;
                Ok::<_, ExecutorError>(models_from_json(&response)?)
            },
            || async {
                let output = self.run_cli(["list"], self.timeouts.cli).await?;
                Ok::<_, StructuredError>(parse_model_list(&output.stdout))
            },
        )
        .await
    }

    /// Models currently loaded into memory.
    pub async fn list_running_models(&self) -> OpResult<Vec<RunningModelDescriptor>> {
        run_with_fallback(
            "list_running_models",
            async {
                let response = self.executor.execute(HttpMethod::Get, PS_PATH, None).await?;
                Ok::<_, ExecutorError>(running_from_json(&response)?)
            },
            || async {
                let output = self.run_cli(["ps"], self.timeouts.cli).await?;
                Ok::<_, StructuredError>(parse_running_list(&output.stdout))
            },
        )
        .await
    }

    pub async fn pull_model(&self, name: &str) -> OpResult<ActionOutcome> {
        let name = require_model_name(name)?;
        info!(model = name, "Pulling model");
        run_with_fallback(
            "pull_model",
            async {
                let response = self
                    .executor
                    .execute_with_timeout(
                        HttpMethod::Post,
                        PULL_PATH,
                        Some(json!({ "name": name, "stream": false })),
                        self.timeouts.pull,
                    )
                    .await?;
                reject_error_body(&response)?;
                Ok::<_, ExecutorError>(())
            },
            || async {
                self.run_cli(["pull", name], self.timeouts.pull).await?;
                Ok::<_, StructuredError>(())
            },
        )
        .await?;
        Ok(ActionOutcome::success(format!(
            "Model {name} pulled successfully"
        )))
    }

    pub async fn delete_model(&self, name: &str) -> OpResult<ActionOutcome> {
        let name = require_model_name(name)?;
        info!(model = name, "Deleting model");
        run_with_fallback(
            "delete_model",
            async {
                let response = self
                    .executor
                    .execute(HttpMethod::Delete, DELETE_PATH, Some(json!({ "name": name })))
                    .await?;
                reject_error_body(&response)?;
                Ok::<_, ExecutorError>(())
            },
            || async {
                self.run_cli(["rm", name], self.timeouts.cli).await?;
                Ok::<_, StructuredError>(())
            },
        )
        .await?;
        Ok(ActionOutcome::success(format!(
            "Model {name} deleted successfully"
        )))
    }

    /// Unload a model from memory. The model stays installed.
    pub async fn stop_model(&self, name: &str) -> OpResult<ActionOutcome> {
        let name = require_model_name(name)?;
        info!(model = name, "Stopping model");
        run_with_fallback(
            "stop_model",
            async {
                let response = self
                    .executor
                    .execute(
                        HttpMethod::Post,
                        GENERATE_PATH,
                        Some(json!({ "model": name, "keep_alive": 0 })),
                    )
                    .await?;
                reject_error_body(&response)?;
                Ok::<_, ExecutorError>(())
            },
            || async {
                self.run_cli(["stop", name], self.timeouts.cli).await?;
                Ok::<_, StructuredError>(())
            },
        )
        .await?;
        Ok(ActionOutcome::success(format!(
            "Model {name} stopped successfully"
        )))
    }

    /// One non-streaming generation call. HTTP only: the command line offers
    /// no timing counters.
    pub async fn generate(&self, model: &str, prompt: &str) -> OpResult<GenerationStats> {
        let model = require_model_name(model)?;
        let response = self
            .executor
            .execute_with_timeout(
                HttpMethod::Post,
                GENERATE_PATH,
                Some(json!({ "model": model, "prompt": prompt, "stream": false })),
                self.timeouts.generate,
            )
            .await
            .map_err(ExecutorError::into_structured)?;
        reject_error_body(&response)?;
        if response.body.trim().is_empty() {
            return Ok(GenerationStats::default());
        }
        Ok(serde_json::from_str(&response.body).unwrap_or_else(|e| {
            debug!(model, error = %e, "Generation response carried no counters");
            GenerationStats::default()
        }))
    }

    async fn run_cli<I, S>(&self, args: I, timeout: Duration) -> OpResult<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spec = CommandSpec::new(&self.cli_binary, args, timeout);
        debug!(command = %spec.display(), "Running CLI fallback");
        match self.commands.run(&spec).await {
            Ok(output) if output.success() => Ok(output),
            Ok(output) => Err(StructuredError::new(
                ErrorCode::CommandError,
                format!(
                    "`{}` exited with code {}",
                    spec.display(),
                    output
                        .exit_code
                        .map_or_else(|| "signal".to_string(), |c| c.to_string())
                ),
            )
            .with_details(output.diagnostic())),
            Err(CommandError::NotFound(program)) => Err(StructuredError::new(
                ErrorCode::InstallationError,
                format!("`{program}` was not found; is Ollama installed?"),
            )),
            Err(e @ CommandError::Timeout { .. }) => {
                Err(StructuredError::new(ErrorCode::TimeoutError, e.to_string()))
            }
            Err(CommandError::Io(e)) => Err(StructuredError::new(
                ErrorCode::CommandError,
                format!("`{}` could not be executed", spec.display()),
            )
            .with_details(e)),
        }
    }
}

fn malformed(path: &str, err: &serde_json::Error, body: &str) -> StructuredError {
    StructuredError::new(
        ErrorCode::HttpError,
        format!("Unexpected response from {path}"),
    )
    .with_details(format!("{err}: {}", body.chars().take(200).collect::<String>()))
}

fn wire_models(path: &str, response: &HttpResponse) -> OpResult<Vec<WireModel>> {
    if response.body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str::<Listing<WireModel>>(&response.body)
        .map(Listing::into_vec)
        .map_err(|e| malformed(path, &e, &response.body))
}

fn models_from_json(response: &HttpResponse) -> OpResult<Vec<ModelDescriptor>> {
    let mut seen = HashSet::new();
    Ok(wire_models(TAGS_PATH, response)?
        .into_iter()
        .filter_map(|wire| {
            let name = wire.name()?.to_string();
            seen.insert(name.clone()).then(|| ModelDescriptor {
                name,
                size: wire.size.unwrap_or_default(),
                digest: wire.digest.unwrap_or_default(),
                modified_at: wire.modified_at.unwrap_or_default(),
            })
        })
        .collect())
}

fn running_from_json(response: &HttpResponse) -> OpResult<Vec<RunningModelDescriptor>> {
    let mut seen = HashSet::new();
    Ok(wire_models(PS_PATH, response)?
        .into_iter()
        .filter_map(|wire| {
            let name = wire.name()?.to_string();
            seen.insert(name.clone()).then(|| RunningModelDescriptor {
                name,
                status: wire
                    .status
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| RUNNING_STATUS_LABEL.to_string()),
                instance_id: wire.digest.filter(|d| !d.is_empty()),
                size: wire.size,
                expires_at: wire.expires_at,
            })
        })
        .collect())
}

/// A 2xx body of the form `{"error": "..."}` is still a failure.
fn reject_error_body(response: &HttpResponse) -> Result<(), StructuredError> {
    let Ok(body) = response.json() else {
        return Ok(());
    };
    match body.get("error").and_then(serde_json::Value::as_str) {
        Some(message) => Err(StructuredError::new(ErrorCode::HttpError, message)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::TransportError;
    use crate::services::executor::RetryPolicy;
    use crate::test_support::{ScriptedCommands, ScriptedHttp, connected_tracker};
    use tokio_test::assert_ok;

    async fn service(http: &Arc<ScriptedHttp>, commands: &Arc<ScriptedCommands>) -> ModelService {
        let tracker = connected_tracker(http).await;
        let executor = Arc::new(RequestExecutor::new(
            http.clone(),
            tracker,
            RetryPolicy {
                max_attempts: 3,
                delay: Duration::from_millis(1),
            },
            Duration::from_secs(5),
        ));
        ModelService::new(executor, commands.clone(), "ollama", ModelTimeouts::default())
    }

    #[tokio::test]
    async fn test_list_models_over_http() {
        let http = Arc::new(ScriptedHttp::new());
        let commands = Arc::new(ScriptedCommands::new());
        http.respond(
            HttpMethod::Get,
            TAGS_PATH,
            200,
            r#"{"models":[
                {"name":"llama2:latest","size":3826793677,"digest":"78e2","modified_at":"2024-05-01T10:00:00Z"},
                {"model":"phi3:mini"},
                {"size":12}
            ]}"#,
        );

        let models = service(&http, &commands).await.list_models().await.unwrap();

        assert_eq!(models.len(), 2);
        assert_eq!(models[0].size, 3_826_793_677);
        assert_eq!(models[1].name, "phi3:mini");
        assert_eq!(models[1].digest, "");
        assert_eq!(commands.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_list_models_accepts_bare_array() {
        let http = Arc::new(ScriptedHttp::new());
        let commands = Arc::new(ScriptedCommands::new());
        http.respond(HttpMethod::Get, TAGS_PATH, 200, r#"[{"name":"a"},{"name":"a"}]"#);

        let models = service(&http, &commands).await.list_models().await.unwrap();
        assert_eq!(models.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_installation_is_not_an_error() {
        let http = Arc::new(ScriptedHttp::new());
        let commands = Arc::new(ScriptedCommands::new());
        http.respond(HttpMethod::Get, TAGS_PATH, 200, r#"{"models":[]}"#);

        let models = service(&http, &commands).await.list_models().await.unwrap();
        assert!(models.is_empty());
    }

    #[tokio::test]
    async fn test_list_models_falls_back_on_404() {
        let http = Arc::new(ScriptedHttp::new());
        let commands = Arc::new(ScriptedCommands::new());
        http.respond(HttpMethod::Get, TAGS_PATH, 404, "404 page not found");
        commands.succeed("list", "NAME SIZE\nllama2 3.8GB\n");

        let models = service(&http, &commands).await.list_models().await.unwrap();

        assert_eq!(models.len(), 1);
        assert_eq!(models[0].name, "llama2");
        assert_eq!(commands.calls_with("list"), 1);
    }

    #[tokio::test]
    async fn test_list_running_models_falls_back_on_404() {
        let http = Arc::new(ScriptedHttp::new());
        let commands = Arc::new(ScriptedCommands::new());
        http.respond(HttpMethod::Get, PS_PATH, 404, "404 page not found");
        commands.succeed(
            "ps",
            "NAME            ID              SIZE      PROCESSOR    UNTIL\n\
             llama2:latest   78e26419b446    5.4 GB    100% GPU     4 minutes from now\n",
        );

        let running = assert_ok!(service(&http, &commands).await.list_running_models().await);

        assert_eq!(running.len(), 1);
        assert_eq!(running[0].name, "llama2:latest");
        assert_eq!(running[0].status, RUNNING_STATUS_LABEL);
        assert_eq!(running[0].instance_id.as_deref(), Some("78e26419b446"));
        assert_eq!(http.calls_to(PS_PATH), 1);
        assert_eq!(commands.calls_with("ps"), 1);
    }

    #[tokio::test]
    async fn test_timeouts_do_not_fall_back() {
        let http = Arc::new(ScriptedHttp::new());
        let commands = Arc::new(ScriptedCommands::new());
        http.on_repeat(HttpMethod::Get, PS_PATH, || {
            Err(TransportError::Timeout("deadline".into()))
        });
        commands.succeed("ps", "NAME ID\nllama2 abc\n");

        let err = service(&http, &commands)
            .await
            .list_running_models()
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::TimeoutError);
        assert_eq!(commands.calls_with("ps"), 0);
    }

    #[tokio::test]
    async fn test_running_models_use_digest_as_instance() {
        let http = Arc::new(ScriptedHttp::new());
        let commands = Arc::new(ScriptedCommands::new());
        http.respond(
            HttpMethod::Get,
            PS_PATH,
            200,
            r#"{"models":[{"name":"llama2","digest":"abc","size":10,"expires_at":"soon"}]}"#,
        );

        let running = service(&http, &commands)
            .await
            .list_running_models()
            .await
            .unwrap();

        assert_eq!(running[0].status, RUNNING_STATUS_LABEL);
        assert_eq!(running[0].instance_id.as_deref(), Some("abc"));
        assert_eq!(running[0].size, Some(10));
    }

    #[tokio::test]
    async fn test_stop_rejects_empty_name_without_io() {
        let http = Arc::new(ScriptedHttp::new());
        let commands = Arc::new(ScriptedCommands::new());
        let service = service(&http, &commands).await;
        let before = http.total_calls();

        let err = service.stop_model("  ").await.unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(http.total_calls(), before);
        assert_eq!(commands.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_stop_sends_keep_alive_zero() {
        let http = Arc::new(ScriptedHttp::new());
        let commands = Arc::new(ScriptedCommands::new());
        http.respond(HttpMethod::Post, GENERATE_PATH, 200, "");

        let outcome = service(&http, &commands)
            .await
            .stop_model("llama2")
            .await
            .unwrap();

        assert_eq!(outcome.status, "success");
        assert_eq!(outcome.message, "Model llama2 stopped successfully");
        let request = http
            .requests()
            .into_iter()
            .find(|r| r.url.ends_with(GENERATE_PATH))
            .unwrap();
        assert_eq!(request.body.unwrap()["keep_alive"], 0);
    }

    #[tokio::test]
    async fn test_pull_fallback_reports_command_error() {
        let http = Arc::new(ScriptedHttp::new());
        let commands = Arc::new(ScriptedCommands::new());
        http.respond(HttpMethod::Post, PULL_PATH, 404, "");
        commands.fail("pull", 1, "Error: pull model manifest: file does not exist");

        let err = service(&http, &commands)
            .await
            .pull_model("nope")
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::CommandError);
        assert!(err.details.unwrap().contains("file does not exist"));
        let spec = &commands.calls()[0];
        assert_eq!(spec.args, ["pull", "nope"]);
        assert_eq!(spec.timeout, ModelTimeouts::default().pull);
    }

    #[tokio::test]
    async fn test_delete_fallback_without_binary() {
        let http = Arc::new(ScriptedHttp::new());
        let commands = Arc::new(ScriptedCommands::new());
        http.respond(HttpMethod::Delete, DELETE_PATH, 404, "");

        let err = service(&http, &commands)
            .await
            .delete_model("llama2")
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InstallationError);
    }

    #[tokio::test]
    async fn test_error_body_is_failure() {
        let http = Arc::new(ScriptedHttp::new());
        let commands = Arc::new(ScriptedCommands::new());
        http.respond(
            HttpMethod::Post,
            PULL_PATH,
            200,
            r#"{"error":"pull model manifest: file does not exist"}"#,
        );

        let err = service(&http, &commands)
            .await
            .pull_model("nope")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::HttpError);
    }

    #[tokio::test]
    async fn test_generate_reads_counters() {
        let http = Arc::new(ScriptedHttp::new());
        let commands = Arc::new(ScriptedCommands::new());
        http.respond(
            HttpMethod::Post,
            GENERATE_PATH,
            200,
            r#"{"response":"Once upon a time","done":true,"eval_count":50,"eval_duration":2000000000}"#,
        );

        let stats = service(&http, &commands)
            .await
            .generate("llama2", "hi")
            .await
            .unwrap();

        assert_eq!(stats.eval_count, Some(50));
        assert!((stats.tokens_per_second().unwrap() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_tokens_per_second_needs_duration() {
        let stats = GenerationStats {
            eval_count: Some(10),
            eval_duration: Some(0),
        };
        assert!(stats.tokens_per_second().is_none());
    }
}
