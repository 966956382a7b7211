//! Error classification for the OTLP clients, including server-provided
//! throttling hints: the HTTP `Retry-After` header and gRPC `RetryInfo`.

use std::time::Duration;

/// Longest throttle a server can impose on one attempt.
const MAX_THROTTLE: Duration = Duration::from_secs(600);

/// How a failed attempt should be treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetryErrorType {
    /// Not worth retrying.
    NonRetryable,
    /// Retry after the regular backoff.
    Retryable,
    /// Retry, waiting at least the given duration.
    Throttled(Duration),
}

/// HTTP-specific error classification with Retry-After header support.
#[cfg(any(feature = "http-proto", feature = "http-json"))]
pub(crate) mod http {
    use super::*;
    use std::time::SystemTime;

    /// Classifies a non-success HTTP status.
    ///
    /// Only `429 Too Many Requests` and `503 Service Unavailable` are
    /// retryable. Both honour a `Retry-After` header, given either as delay
    /// seconds (`"120"`) or as an HTTP date (`"Fri, 31 Dec 1999 23:59:59 GMT"`).
    pub(crate) fn classify_http_error(
        status_code: u16,
        retry_after_header: Option<&str>,
    ) -> RetryErrorType {
        match status_code {
            429 | 503 => retry_after_header
                .and_then(parse_retry_after)
                .map(RetryErrorType::Throttled)
                .unwrap_or(RetryErrorType::Retryable),
            _ => RetryErrorType::NonRetryable,
        }
    }

    /// Returns None if the value is neither delay seconds nor an HTTP date.
    fn parse_retry_after(retry_after: &str) -> Option<Duration> {
        let retry_after = retry_after.trim();
        if let Ok(seconds) = retry_after.parse::<u64>() {
            return Some(Duration::from_secs(seconds).min(MAX_THROTTLE));
        }

        let date = httpdate::parse_http_date(retry_after).ok()?;
        let delay = date
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO);
        Some(delay.min(MAX_THROTTLE))
    }
}

/// gRPC-specific error classification with RetryInfo support.
#[cfg(feature = "grpc-tonic")]
pub(crate) mod grpc {
    use super::*;
    use tonic_types::StatusExt;

    /// Classifies a tonic::Status error
    pub(crate) fn classify_tonic_status(status: &tonic::Status) -> RetryErrorType {
        let retry_info = status
            .get_details_retry_info()
            .and_then(|retry_info| retry_info.retry_delay);

        classify_grpc_error(status.code(), retry_info)
    }

    /// Implements the failure handling of the OTLP specification:
    /// <https://github.com/open-telemetry/opentelemetry-proto/blob/main/docs/specification.md#failures>
    fn classify_grpc_error(grpc_code: tonic::Code, retry_info: Option<Duration>) -> RetryErrorType {
        match grpc_code {
            // Retryable only when the server says when to come back.
            tonic::Code::ResourceExhausted => match retry_info {
                Some(delay) => RetryErrorType::Throttled(delay.min(MAX_THROTTLE)),
                None => RetryErrorType::NonRetryable,
            },

            tonic::Code::Cancelled
            | tonic::Code::DeadlineExceeded
            | tonic::Code::Aborted
            | tonic::Code::OutOfRange
            | tonic::Code::Unavailable
            | tonic::Code::DataLoss => RetryErrorType::Retryable,

            tonic::Code::Ok
            | tonic::Code::Unknown
            | tonic::Code::InvalidArgument
            | tonic::Code::NotFound
            | tonic::Code::AlreadyExists
            | tonic::Code::PermissionDenied
            | tonic::Code::FailedPrecondition
            | tonic::Code::Unimplemented
            | tonic::Code::Internal
            | tonic::Code::Unauthenticated => RetryErrorType::NonRetryable,
        }
    }
}
