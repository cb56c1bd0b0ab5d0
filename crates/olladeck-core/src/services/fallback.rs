//! HTTP-first, CLI-second execution.

use std::future::Future;

use tracing::info;

use crate::error::OpResult;
use crate::services::executor::ExecutorError;

/// Run `primary`; when it reports the endpoint as unsupported, run `fallback`.
///
/// Every other primary failure is returned as is. The fallback future is only
/// constructed when needed, so no command is spawned on the happy path.
pub async fn run_with_fallback<T, P, F, Fut>(operation: &str, primary: P, fallback: F) -> OpResult<T>
where
    P: Future<Output = Result<T, ExecutorError>>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = OpResult<T>>,
{
    match primary.await {
        Ok(value) => Ok(value),
        Err(err) if err.permits_fallback() => {
            info!(operation, reason = %err, "HTTP endpoint unsupported, using command line");
            fallback().await
        }
        Err(err) => Err(err.into_structured()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, StructuredError};

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let mut fallback_ran = false;
        let result = run_with_fallback("list", async { Ok::<_, ExecutorError>(1) }, || {
            fallback_ran = true;
            async { Ok(2) }
        })
        .await;
        assert_eq!(result.unwrap(), 1);
        assert!(!fallback_ran);
    }

    #[tokio::test]
    async fn test_unsupported_runs_fallback() {
        let result = run_with_fallback(
            "list",
            async {
                Err::<i32, _>(ExecutorError::Unsupported(StructuredError::new(
                    ErrorCode::HttpError,
                    "404",
                )))
            },
            || async { Ok(2) },
        )
        .await;
        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_other_failures_are_returned() {
        let mut fallback_ran = false;
        let result = run_with_fallback(
            "list",
            async {
                Err::<i32, _>(ExecutorError::Failed(StructuredError::new(
                    ErrorCode::TimeoutError,
                    "slow",
                )))
            },
            || {
                fallback_ran = true;
                async { Ok(2) }
            },
        )
        .await;
        assert_eq!(result.unwrap_err().code, ErrorCode::TimeoutError);
        assert!(!fallback_ran);
    }
}
