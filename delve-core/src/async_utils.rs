//! Async helpers shared across the workspace

use crate::{DelveError, DelveResult, ErrorContext};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run a future under a deadline.
///
/// Returns [`DelveError::Timeout`] when the deadline elapses; the inner
/// future is dropped at that point.
pub async fn with_timeout<F, T>(future: F, timeout_ms: u64, operation_name: &str) -> DelveResult<T>
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(Duration::from_millis(timeout_ms), future).await {
        Ok(value) => Ok(value),
        Err(_) => {
            warn!(
                operation = operation_name,
                timeout_ms, "Operation timed out"
            );
            Err(DelveError::Timeout {
                operation: operation_name.to_string(),
                duration_ms: timeout_ms,
                context: ErrorContext::new("async_utils")
                    .with_operation(operation_name)
                    .with_suggestion("Increase the timeout or check provider latency"),
            })
        }
    }
}
