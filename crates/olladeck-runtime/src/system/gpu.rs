//! NVIDIA accelerator probe.
//!
//! Runs `nvidia-smi` in CSV mode and reads the first GPU line:
//! utilization, memory used, memory total, temperature.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use olladeck_core::domain::{AcceleratorStats, AcceleratorStatus};
use olladeck_core::ports::{AcceleratorProbePort, CommandError, CommandRunner, CommandSpec};
use tracing::debug;

pub const NVIDIA_SMI: &str = "nvidia-smi";

const QUERY_ARGS: [&str; 2] = [
    "--query-gpu=utilization.gpu,memory.used,memory.total,temperature.gpu",
    "--format=csv,noheader,nounits",
];

pub struct NvidiaSmiProbe {
    commands: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl NvidiaSmiProbe {
    pub fn new(commands: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { commands, timeout }
    }
}

#[async_trait]
impl AcceleratorProbePort for NvidiaSmiProbe {
    async fn read(&self) -> AcceleratorStatus {
        let spec = CommandSpec::new(NVIDIA_SMI, QUERY_ARGS, self.timeout);
        match self.commands.run(&spec).await {
            Ok(output) if output.success() => parse_nvidia_smi(&output.stdout),
            Ok(output) => AcceleratorStatus::Error {
                message: format!("{NVIDIA_SMI} failed: {}", output.diagnostic()),
            },
            Err(CommandError::NotFound(_)) => AcceleratorStatus::Unavailable {
                reason: format!("{NVIDIA_SMI} not found; no NVIDIA GPU or driver installed"),
            },
            Err(CommandError::Timeout { seconds, .. }) => AcceleratorStatus::Timeout { seconds },
            Err(CommandError::Io(e)) => {
                debug!(error = %e, "Accelerator probe could not run");
                AcceleratorStatus::Error { message: e }
            }
        }
    }
}

/// Parse `nvidia-smi` CSV output. Only the first GPU is reported.
pub fn parse_nvidia_smi(stdout: &str) -> AcceleratorStatus {
    let Some(line) = stdout.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return AcceleratorStatus::Unavailable {
            reason: "no GPU reported".to_string(),
        };
    };

    let fields: Vec<f32> = match line
        .split(',')
        .map(|f| f.trim().parse::<f32>())
        .collect::<Result<_, _>>()
    {
        Ok(fields) => fields,
        Err(e) => {
            return AcceleratorStatus::Error {
                message: format!("unparseable {NVIDIA_SMI} output `{line}`: {e}"),
            };
        }
    };

    match fields[..] {
        [utilization_percent, memory_used_mib, memory_total_mib, temperature_c] => {
            AcceleratorStatus::Ok(AcceleratorStats {
                utilization_percent,
                memory_used_mib,
                memory_total_mib,
                temperature_c,
            })
        }
        _ => AcceleratorStatus::Error {
            message: format!("expected 4 fields from {NVIDIA_SMI}, got {}", fields.len()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use olladeck_core::test_support::ScriptedCommands;

    #[test]
    fn test_parse_first_gpu() {
        let status = parse_nvidia_smi("37, 2048, 8192, 61\n12, 100, 8192, 40\n");
        let AcceleratorStatus::Ok(stats) = status else {
            panic!("expected stats, got {status:?}");
        };
        assert!((stats.utilization_percent - 37.0).abs() < f32::EPSILON);
        assert!((stats.memory_percent() - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_bad_output() {
        assert!(matches!(
            parse_nvidia_smi("[N/A], 1, 2, 3"),
            AcceleratorStatus::Error { .. }
        ));
        assert!(matches!(
            parse_nvidia_smi("1, 2"),
            AcceleratorStatus::Error { .. }
        ));
        assert!(matches!(
            parse_nvidia_smi("\n"),
            AcceleratorStatus::Unavailable { .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_tool_is_unavailable() {
        let probe = NvidiaSmiProbe::new(Arc::new(ScriptedCommands::new()), Duration::from_secs(1));
        assert!(matches!(
            probe.read().await,
            AcceleratorStatus::Unavailable { .. }
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let commands = Arc::new(ScriptedCommands::new());
        commands.on_repeat(QUERY_ARGS[0], || {
            Err(CommandError::Timeout {
                command: NVIDIA_SMI.to_string(),
                seconds: 5,
            })
        });
        let probe = NvidiaSmiProbe::new(commands, Duration::from_secs(5));
        assert_eq!(probe.read().await, AcceleratorStatus::Timeout { seconds: 5 });
    }

    #[tokio::test]
    async fn test_reads_scripted_output() {
        let commands = Arc::new(ScriptedCommands::new());
        commands.succeed(QUERY_ARGS[0], "50, 4096, 8192, 70\n");
        let probe = NvidiaSmiProbe::new(commands.clone(), Duration::from_secs(5));

        assert!(matches!(probe.read().await, AcceleratorStatus::Ok(_)));
        assert_eq!(commands.calls()[0].program, NVIDIA_SMI);
    }
}
