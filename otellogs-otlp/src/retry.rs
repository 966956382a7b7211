//! Retries an upload with exponential backoff and jitter.
//!
//! Every attempt and every sleep races the client's stop signal and the
//! per-call deadline, so a stopped client or an expired call returns promptly
//! instead of waiting out the backoff.

use crate::client::ClientError;
use crate::retry_classification::RetryErrorType;
use otellogs::otel_warn;
use std::future::Future;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::Instant;

/// Configuration for retrying failed uploads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Whether retryable failures are retried at all.
    pub enabled: bool,
    /// Backoff before the first retry.
    pub initial_interval: Duration,
    /// Upper bound of the exponential backoff. A server throttle may exceed
    /// it.
    pub max_interval: Duration,
    /// Total time after which no further attempt is scheduled.
    pub max_elapsed_time: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            enabled: true,
            initial_interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(30),
            max_elapsed_time: Duration::from_secs(60),
        }
    }
}

/// A failed attempt together with how the retry loop should treat it.
#[derive(Debug)]
pub(crate) struct AttemptError {
    pub(crate) error: ClientError,
    pub(crate) kind: RetryErrorType,
}

impl AttemptError {
    pub(crate) fn permanent(error: ClientError) -> Self {
        AttemptError {
            error,
            kind: RetryErrorType::NonRetryable,
        }
    }
}

// Generates a jitter value up to max_jitter
fn generate_jitter(max_jitter: Duration) -> Duration {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as u64;
    let max_millis = max_jitter.as_millis() as u64;
    Duration::from_millis(nanos % (max_millis + 1))
}

fn ensure_live(stop: &watch::Receiver<bool>, deadline: Instant) -> Result<(), ClientError> {
    if *stop.borrow() {
        return Err(ClientError::Cancelled);
    }
    if Instant::now() >= deadline {
        return Err(ClientError::DeadlineExceeded);
    }
    Ok(())
}

/// Runs `fut` unless the client was stopped or the deadline passed, and
/// abandons it as soon as either happens.
pub(crate) async fn cancellable<F: Future>(
    stop: &mut watch::Receiver<bool>,
    deadline: Instant,
    fut: F,
) -> Result<F::Output, ClientError> {
    ensure_live(stop, deadline)?;
    tokio::select! {
        output = fut => Ok(output),
        _ = stop.wait_for(|stopped| *stopped) => Err(ClientError::Cancelled),
        _ = tokio::time::sleep_until(deadline) => Err(ClientError::DeadlineExceeded),
    }
}

/// Retries `operation` per `config` until it succeeds, fails permanently, or
/// the next wait would run past `max_elapsed_time`.
///
/// With retries disabled the first error is returned as is. Exhausted
/// retries surface as [`ClientError::RetriesExhausted`] wrapping the last
/// error.
pub(crate) async fn retry_with_backoff<F, Fut, T>(
    config: &RetryConfig,
    mut stop: watch::Receiver<bool>,
    deadline: Instant,
    operation_name: &str,
    mut operation: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let started = Instant::now();
    let mut backoff = config.initial_interval;

    loop {
        ensure_live(&stop, deadline)?;
        let AttemptError { error, kind } =
            match cancellable(&mut stop, deadline, operation()).await? {
                Ok(result) => return Ok(result),
                Err(err) => err,
            };

        if !config.enabled {
            return Err(error);
        }
        let delay = match kind {
            RetryErrorType::NonRetryable => return Err(error),
            RetryErrorType::Retryable => jittered(backoff, config.max_interval),
            RetryErrorType::Throttled(throttle) => {
                throttle.max(jittered(backoff, config.max_interval))
            }
        };
        if started.elapsed() + delay > config.max_elapsed_time {
            return Err(ClientError::RetriesExhausted(Box::new(error)));
        }

        otel_warn!(
            name: "OtlpRetry",
            operation = operation_name,
            error = format!("{error}"),
            delay_ms = delay.as_millis() as u64
        );
        cancellable(&mut stop, deadline, tokio::time::sleep(delay)).await?;
        backoff = backoff.saturating_mul(2).min(config.max_interval);
    }
}

fn jittered(backoff: Duration, max_interval: Duration) -> Duration {
    (backoff + generate_jitter(backoff / 10)).min(max_interval)
}
