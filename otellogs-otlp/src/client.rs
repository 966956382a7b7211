//! The transport contract behind [`OtlpLogExporter`](crate::OtlpLogExporter).

use async_trait::async_trait;
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsPartialSuccess;
use opentelemetry_proto::tonic::logs::v1::ResourceLogs;
use otellogs::logs::LogError;
use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Sends already transformed records to a collector.
///
/// The exporter calls [`start`](LogsClient::start) and
/// [`stop`](LogsClient::stop) at most once each, so implementations need no
/// idempotence of their own. `upload_logs` may run concurrently with itself
/// and with `stop`.
#[async_trait]
pub trait LogsClient: Send + Sync + Debug {
    /// Establishes whatever the transport needs before the first upload.
    async fn start(&self) -> Result<(), ClientError>;

    /// Cancels in-flight uploads and releases the transport. Once it returns,
    /// the transport handle is gone.
    async fn stop(&self) -> Result<(), ClientError>;

    /// Sends one export request holding `resource_logs`, retrying per the
    /// client's retry configuration.
    async fn upload_logs(&self, resource_logs: Vec<ResourceLogs>) -> Result<(), ClientError>;
}

/// Errors returned by a [`LogsClient`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClientError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync + 'static>),

    /// The collector answered with a status that is neither success nor
    /// retryable.
    #[error("failed to send to {endpoint}: {status}")]
    Status {
        /// Where the request went.
        endpoint: String,
        /// The HTTP status line, e.g. `400 Bad Request`.
        status: String,
    },

    /// The collector answered with a gRPC status that is not retryable.
    #[error("gRPC request failed with code {0}: {1}")]
    Grpc(i32, String),

    /// Retrying gave up; holds the last retryable error.
    #[error("retries exhausted, last error: {0}")]
    RetriesExhausted(Box<ClientError>),

    /// The client was stopped while the upload was pending.
    #[error("upload cancelled: client stopped")]
    Cancelled,

    /// The upload did not finish within the configured timeout.
    #[error("upload deadline exceeded")]
    DeadlineExceeded,

    /// `upload_logs` was called before `start`.
    #[error("client not started")]
    NotStarted,

    /// `upload_logs` was called after `stop`.
    #[error("client already stopped")]
    AlreadyStopped,

    /// The request body could not be built.
    #[error("failed to encode request: {0}")]
    Encode(String),

    /// A success response carried a body that could not be read.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    /// True for the errors caused by the client being stopped or the call
    /// running out of time, rather than by the collector.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ClientError::Cancelled | ClientError::DeadlineExceeded)
    }
}

/// Receives the errors a client reports out of band, such as partial
/// success responses.
#[derive(Clone)]
pub struct ErrorHandler(Arc<dyn Fn(LogError) + Send + Sync>);

impl ErrorHandler {
    /// Wraps `f`.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(LogError) + Send + Sync + 'static,
    {
        ErrorHandler(Arc::new(f))
    }

    pub(crate) fn handle(&self, err: LogError) {
        (self.0)(err)
    }
}

impl Default for ErrorHandler {
    /// Forwards to [`otellogs::global::handle_error`].
    fn default() -> Self {
        ErrorHandler::new(|err| otellogs::global::handle_error(err))
    }
}

impl Debug for ErrorHandler {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ErrorHandler(..)")
    }
}

/// Reports a partial success through `handler`. Returns whether anything was
/// reported.
pub(crate) fn report_partial_success(
    handler: &ErrorHandler,
    partial_success: Option<&ExportLogsPartialSuccess>,
) -> bool {
    match partial_success {
        Some(partial)
            if partial.rejected_log_records != 0 || !partial.error_message.is_empty() =>
        {
            handler.handle(LogError::PartialSuccess {
                message: partial.error_message.clone(),
                rejected: partial.rejected_log_records,
            });
            true
        }
        _ => false,
    }
}

/// Start and stop bookkeeping shared by the clients.
///
/// The stop flag lives in a watch channel so every pending upload can wait
/// on it.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    started: AtomicBool,
    stop: watch::Sender<bool>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        let (stop, _) = watch::channel(false);
        Lifecycle {
            started: AtomicBool::new(false),
            stop,
        }
    }

    pub(crate) fn mark_started(&self) {
        self.started.store(true, Ordering::Release);
    }

    /// Flips the stop flag, waking every pending upload.
    pub(crate) fn mark_stopped(&self) {
        self.stop.send_replace(true);
    }

    /// A receiver for the stop flag, or the reason uploads are refused.
    pub(crate) fn upload_guard(&self) -> Result<watch::Receiver<bool>, ClientError> {
        if *self.stop.borrow() {
            return Err(ClientError::AlreadyStopped);
        }
        if !self.started.load(Ordering::Acquire) {
            return Err(ClientError::NotStarted);
        }
        Ok(self.stop.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn cancellation_errors() {
        assert!(ClientError::Cancelled.is_cancellation());
        assert!(ClientError::DeadlineExceeded.is_cancellation());
        assert!(!ClientError::NotStarted.is_cancellation());
        assert!(!ClientError::RetriesExhausted(Box::new(ClientError::Cancelled)).is_cancellation());
    }

    #[test]
    fn status_error_message() {
        let err = ClientError::Status {
            endpoint: "http://localhost:4318/v1/logs".into(),
            status: "400 Bad Request".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to send to http://localhost:4318/v1/logs: 400 Bad Request"
        );
    }

    #[test]
    fn partial_success_is_reported_once() {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);
        let handler = ErrorHandler::new(move |err| sink.lock().unwrap().push(err.to_string()));

        let partial = ExportLogsPartialSuccess {
            rejected_log_records: 2,
            error_message: "partial".into(),
        };
        assert!(report_partial_success(&handler, Some(&partial)));

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains('2'));
        assert!(reports[0].contains("partial"));
    }

    #[test]
    fn empty_partial_success_is_not_reported() {
        let handler = ErrorHandler::new(|err| panic!("unexpected report: {err}"));

        assert!(!report_partial_success(&handler, None));
        assert!(!report_partial_success(
            &handler,
            Some(&ExportLogsPartialSuccess::default())
        ));
    }

    #[test]
    fn lifecycle_refuses_uploads_outside_started_state() {
        let lifecycle = Lifecycle::new();
        assert!(matches!(
            lifecycle.upload_guard(),
            Err(ClientError::NotStarted)
        ));

        lifecycle.mark_started();
        let receiver = lifecycle.upload_guard().unwrap();
        assert!(!*receiver.borrow());

        lifecycle.mark_stopped();
        assert!(*receiver.borrow());
        assert!(matches!(
            lifecycle.upload_guard(),
            Err(ClientError::AlreadyStopped)
        ));
    }
}
