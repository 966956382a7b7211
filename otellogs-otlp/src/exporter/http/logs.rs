use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_ENCODING, CONTENT_TYPE, RETRY_AFTER};
use http::{HeaderValue, Method, StatusCode};
use opentelemetry_proto::tonic::logs::v1::ResourceLogs;
use otellogs::{otel_debug, otel_warn};
use otellogs_http::HttpClient;
use tokio::time::Instant;

use super::HttpLogsClient;
use crate::client::{report_partial_success, ClientError, LogsClient};
use crate::retry::{retry_with_backoff, AttemptError};
use crate::retry_classification::http::classify_http_error;

#[async_trait]
impl LogsClient for HttpLogsClient {
    async fn start(&self) -> Result<(), ClientError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), ClientError> {
        self.lifecycle.mark_stopped();
        self.client.lock().map_err(poisoned)?.take();
        otel_debug!(name: "HttpLogsClient.Stopped");
        Ok(())
    }

    async fn upload_logs(&self, resource_logs: Vec<ResourceLogs>) -> Result<(), ClientError> {
        let stop = self.lifecycle.upload_guard()?;
        let client = self
            .client
            .lock()
            .map_err(poisoned)?
            .as_ref()
            .map(Arc::clone)
            .ok_or(ClientError::AlreadyStopped)?;

        let (body, content_type, content_encoding) = self.build_logs_export_body(resource_logs)?;
        let body = Bytes::from(body);
        let deadline = Instant::now() + self.timeout;

        retry_with_backoff(&self.retry, stop, deadline, "HttpLogsClient.Export", || {
            let client = Arc::clone(&client);
            let body = body.clone();
            async move {
                self.send_once(client.as_ref(), body, content_type, content_encoding)
                    .await
            }
        })
        .await
    }
}

fn poisoned<E: fmt::Display>(e: E) -> ClientError {
    ClientError::Transport(format!("failed to acquire lock: {e}").into())
}

impl HttpLogsClient {
    async fn send_once(
        &self,
        client: &dyn HttpClient,
        body: Bytes,
        content_type: &'static str,
        content_encoding: Option<&'static str>,
    ) -> Result<(), AttemptError> {
        let mut request = http::Request::builder()
            .method(Method::POST)
            .uri(&self.collector_endpoint)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .map_err(|e| AttemptError::permanent(ClientError::Transport(Box::new(e))))?;

        if let Some(encoding) = content_encoding {
            request
                .headers_mut()
                .insert(CONTENT_ENCODING, HeaderValue::from_static(encoding));
        }
        for (k, v) in &self.headers {
            request.headers_mut().insert(k.clone(), v.clone());
        }

        otel_debug!(name: "HttpLogsClient.ExportStarted");
        let response = client
            .send_bytes(request)
            .await
            .map_err(|e| AttemptError::permanent(ClientError::Transport(e)))?;

        match response.status() {
            StatusCode::OK => {
                if !response.body().is_empty() {
                    let decoded = self
                        .decode_response(response.body())
                        .map_err(AttemptError::permanent)?;
                    if report_partial_success(&self.error_handler, decoded.partial_success.as_ref())
                    {
                        otel_warn!(
                            name: "HttpLogsClient.PartialSuccess",
                            endpoint = self.collector_endpoint.to_string()
                        );
                    }
                }
                otel_debug!(name: "HttpLogsClient.ExportSucceeded");
                Ok(())
            }
            status => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|value| value.to_str().ok());
                Err(AttemptError {
                    kind: classify_http_error(status.as_u16(), retry_after),
                    error: ClientError::Status {
                        endpoint: self.collector_endpoint.to_string(),
                        status: status.to_string(),
                    },
                })
            }
        }
    }
}
