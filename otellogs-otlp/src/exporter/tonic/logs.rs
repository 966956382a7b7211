use core::fmt;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use opentelemetry_proto::tonic::collector::logs::v1::{
    logs_service_client::LogsServiceClient, ExportLogsServiceRequest,
};
use opentelemetry_proto::tonic::logs::v1::ResourceLogs;
use otellogs::{otel_debug, otel_warn};
use tokio::time::Instant;
use tonic::{codec::CompressionEncoding, service::Interceptor, transport::Channel, Request};

use super::{RequestInterceptor, Transport};
use crate::client::{report_partial_success, ClientError, ErrorHandler, Lifecycle, LogsClient};
use crate::retry::{retry_with_backoff, AttemptError, RetryConfig};
use crate::retry_classification::grpc::classify_tonic_status;

/// The gRPC implementation of [`LogsClient`](crate::LogsClient).
///
/// `start` opens the channel. `stop` cancels pending uploads and drops it.
pub(crate) struct TonicLogsClient {
    pending: Mutex<Option<PendingConnection>>,
    inner: Mutex<Option<ClientInner>>,
    compression: Option<CompressionEncoding>,
    timeout: Duration,
    retry: RetryConfig,
    error_handler: ErrorHandler,
    lifecycle: Lifecycle,
}

struct PendingConnection {
    transport: Transport,
    interceptor: RequestInterceptor,
}

struct ClientInner {
    client: LogsServiceClient<Channel>,
    interceptor: RequestInterceptor,
}

impl fmt::Debug for TonicLogsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TonicLogsClient")
    }
}

fn poisoned<E: fmt::Display>(e: E) -> ClientError {
    ClientError::Transport(format!("failed to acquire lock: {e}").into())
}

impl TonicLogsClient {
    pub(super) fn new(
        transport: Transport,
        interceptor: RequestInterceptor,
        compression: Option<CompressionEncoding>,
        timeout: Duration,
        retry: RetryConfig,
        error_handler: ErrorHandler,
    ) -> Self {
        TonicLogsClient {
            pending: Mutex::new(Some(PendingConnection {
                transport,
                interceptor,
            })),
            inner: Mutex::new(None),
            compression,
            timeout,
            retry,
            error_handler,
            lifecycle: Lifecycle::new(),
        }
    }

    #[cfg(test)]
    pub(super) fn endpoint_uri(&self) -> Option<http::Uri> {
        match self.pending.lock().ok()?.as_ref()?.transport {
            Transport::Endpoint(ref endpoint) => Some(endpoint.uri().clone()),
            Transport::Channel(_) => None,
        }
    }

    async fn export_once(&self, request: ExportLogsServiceRequest) -> Result<(), AttemptError> {
        let (mut client, metadata, extensions) = {
            let mut inner = self
                .inner
                .lock()
                .map_err(|e| AttemptError::permanent(poisoned(e)))?;
            let inner = inner
                .as_mut()
                .ok_or_else(|| AttemptError::permanent(ClientError::AlreadyStopped))?;
            let (metadata, extensions, _) = inner
                .interceptor
                .call(Request::new(()))
                .map_err(|status| {
                    otel_warn!(
                        name: "TonicLogsClient.InterceptorFailed",
                        grpc_code = format!("{:?}", status.code())
                    );
                    AttemptError::permanent(ClientError::Grpc(
                        i32::from(status.code()),
                        status.message().to_string(),
                    ))
                })?
                .into_parts();
            (inner.client.clone(), metadata, extensions)
        };

        otel_debug!(name: "TonicLogsClient.ExportStarted");

        match client
            .export(Request::from_parts(metadata, extensions, request))
            .await
        {
            Ok(response) => {
                let partial_success = response.into_inner().partial_success;
                if report_partial_success(&self.error_handler, partial_success.as_ref()) {
                    otel_warn!(name: "TonicLogsClient.PartialSuccess");
                }
                otel_debug!(name: "TonicLogsClient.ExportSucceeded");
                Ok(())
            }
            Err(status) => {
                otel_debug!(
                    name: "TonicLogsClient.ExportFailed",
                    grpc_code = format!("{:?}", status.code()),
                    grpc_message = status.message()
                );
                Err(AttemptError {
                    kind: classify_tonic_status(&status),
                    error: ClientError::Grpc(
                        i32::from(status.code()),
                        status.message().to_string(),
                    ),
                })
            }
        }
    }
}

#[async_trait]
impl LogsClient for TonicLogsClient {
    async fn start(&self) -> Result<(), ClientError> {
        let PendingConnection {
            transport,
            interceptor,
        } = self
            .pending
            .lock()
            .map_err(poisoned)?
            .take()
            .ok_or(ClientError::AlreadyStopped)?;

        let mut client = LogsServiceClient::new(transport.into_channel());
        if let Some(compression) = self.compression {
            client = client
                .send_compressed(compression)
                .accept_compressed(compression);
        }

        *self.inner.lock().map_err(poisoned)? = Some(ClientInner {
            client,
            interceptor,
        });
        self.lifecycle.mark_started();
        otel_debug!(name: "TonicLogsClient.Started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), ClientError> {
        self.lifecycle.mark_stopped();
        self.pending.lock().map_err(poisoned)?.take();
        self.inner.lock().map_err(poisoned)?.take();
        otel_debug!(name: "TonicLogsClient.Stopped");
        Ok(())
    }

    async fn upload_logs(&self, resource_logs: Vec<ResourceLogs>) -> Result<(), ClientError> {
        let stop = self.lifecycle.upload_guard()?;
        let deadline = Instant::now() + self.timeout;
        let request = ExportLogsServiceRequest { resource_logs };

        retry_with_backoff(&self.retry, stop, deadline, "TonicLogsClient.Export", || {
            let request = request.clone();
            async move { self.export_once(request).await }
        })
        .await
    }
}
