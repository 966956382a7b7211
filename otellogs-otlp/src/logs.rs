//! OTLP - Log Exporter
//!
//! Defines [`OtlpLogExporter`], a [`LogExporter`] that sends logs via the
//! OpenTelemetry Protocol (OTLP) through a [`LogsClient`].

#[cfg(feature = "grpc-tonic")]
use crate::exporter::tonic::{HasTonicConfig, TonicConfig, TonicExporterBuilder};

#[cfg(any(feature = "http-proto", feature = "http-json"))]
use crate::exporter::http::{HasHttpConfig, HttpConfig, HttpExporterBuilder};

#[cfg(any(feature = "grpc-tonic", feature = "http-proto", feature = "http-json"))]
use crate::exporter::{ExportConfig, ExporterBuildError, HasExportConfig};

use crate::client::{ClientError, LogsClient};
use crate::transform;
use otellogs::otel_debug;
use otellogs_sdk::error::{SdkError, SdkResult};
use otellogs_sdk::logs::{LogBatch, LogExporter};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use thiserror::Error;

const UNSTARTED: u8 = 0;
const STARTING: u8 = 1;
const STARTED: u8 = 2;
const START_FAILED: u8 = 3;
const STOPPED: u8 = 4;

/// Errors returned by [`OtlpLogExporter`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ExporterError {
    /// `start` was called more than once.
    #[error("exporter already started")]
    AlreadyStarted,

    /// The client failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Typestate marker: no transport chosen yet.
#[derive(Debug, Default, Clone)]
pub struct NoExporterBuilderSet;

/// Typestate marker: the gRPC transport.
#[cfg(feature = "grpc-tonic")]
#[derive(Debug, Default)]
pub struct TonicExporterBuilderSet(TonicExporterBuilder);

/// Typestate marker: the HTTP transport.
#[cfg(any(feature = "http-proto", feature = "http-json"))]
#[derive(Debug, Default)]
pub struct HttpExporterBuilderSet(HttpExporterBuilder);

/// Builder for [`OtlpLogExporter`]. Pick a transport with
/// [`with_http`](LogExporterBuilder::with_http) or
/// [`with_tonic`](LogExporterBuilder::with_tonic), configure it, then
/// `build`.
#[derive(Debug, Default, Clone)]
pub struct LogExporterBuilder<C> {
    client: C,
}

impl LogExporterBuilder<NoExporterBuilderSet> {
    /// A builder with no transport selected.
    pub fn new() -> Self {
        LogExporterBuilder::default()
    }

    /// Send logs over gRPC.
    #[cfg(feature = "grpc-tonic")]
    pub fn with_tonic(self) -> LogExporterBuilder<TonicExporterBuilderSet> {
        LogExporterBuilder {
            client: TonicExporterBuilderSet(TonicExporterBuilder::default()),
        }
    }

    /// Send logs over HTTP.
    #[cfg(any(feature = "http-proto", feature = "http-json"))]
    pub fn with_http(self) -> LogExporterBuilder<HttpExporterBuilderSet> {
        LogExporterBuilder {
            client: HttpExporterBuilderSet(HttpExporterBuilder::default()),
        }
    }
}

#[cfg(feature = "grpc-tonic")]
impl LogExporterBuilder<TonicExporterBuilderSet> {
    /// Build the exporter. The channel is opened by
    /// [`OtlpLogExporter::start`].
    pub fn build(self) -> Result<OtlpLogExporter, ExporterBuildError> {
        let client = self.client.0.build_logs_client()?;
        otel_debug!(name: "OtlpLogExporter.Built", transport = "grpc");
        Ok(OtlpLogExporter::new(client))
    }
}

#[cfg(any(feature = "http-proto", feature = "http-json"))]
impl LogExporterBuilder<HttpExporterBuilderSet> {
    /// Build the exporter.
    pub fn build(self) -> Result<OtlpLogExporter, ExporterBuildError> {
        let client = self.client.0.build_logs_client()?;
        otel_debug!(name: "OtlpLogExporter.Built", transport = "http");
        Ok(OtlpLogExporter::new(client))
    }
}

#[cfg(feature = "grpc-tonic")]
impl HasExportConfig for LogExporterBuilder<TonicExporterBuilderSet> {
    fn export_config(&mut self) -> &mut ExportConfig {
        &mut self.client.0.exporter_config
    }
}

#[cfg(any(feature = "http-proto", feature = "http-json"))]
impl HasExportConfig for LogExporterBuilder<HttpExporterBuilderSet> {
    fn export_config(&mut self) -> &mut ExportConfig {
        &mut self.client.0.exporter_config
    }
}

#[cfg(feature = "grpc-tonic")]
impl HasTonicConfig for LogExporterBuilder<TonicExporterBuilderSet> {
    fn tonic_config(&mut self) -> &mut TonicConfig {
        &mut self.client.0.tonic_config
    }
}

#[cfg(any(feature = "http-proto", feature = "http-json"))]
impl HasHttpConfig for LogExporterBuilder<HttpExporterBuilderSet> {
    fn http_client_config(&mut self) -> &mut HttpConfig {
        &mut self.client.0.http_config
    }
}

/// OTLP exporter that sends log data through a [`LogsClient`].
///
/// The exporter must be [started](OtlpLogExporter::start) before it exports.
/// Start and stop each take effect once: a second `start` fails with
/// [`ExporterError::AlreadyStarted`], and stopping an exporter that never
/// started is a no-op. A `stop` that lands while `start` is in flight is
/// carried out by that `start` once the client is up, and an exporter
/// stopped before it started cannot be started.
///
/// The bundled clients rely on Tokio timers, so the exporter has to be
/// driven from inside a Tokio runtime. Both SDK processors export on a
/// runtime of their own.
#[derive(Debug)]
pub struct OtlpLogExporter {
    client: Arc<dyn LogsClient>,
    start_claimed: AtomicBool,
    stop_claimed: AtomicBool,
    state: AtomicU8,
}

impl OtlpLogExporter {
    /// Obtain a builder to configure an [`OtlpLogExporter`].
    pub fn builder() -> LogExporterBuilder<NoExporterBuilderSet> {
        LogExporterBuilder::default()
    }

    /// Wrap a custom client.
    pub fn new(client: impl LogsClient + 'static) -> Self {
        OtlpLogExporter::from_client(Arc::new(client))
    }

    /// Wrap a shared client.
    pub fn from_client(client: Arc<dyn LogsClient>) -> Self {
        OtlpLogExporter {
            client,
            start_claimed: AtomicBool::new(false),
            stop_claimed: AtomicBool::new(false),
            state: AtomicU8::new(UNSTARTED),
        }
    }

    /// Starts the underlying client. Only the first call reaches it, even
    /// when that call fails.
    pub async fn start(&self) -> Result<(), ExporterError> {
        if self
            .start_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            otel_debug!(name: "OtlpLogExporter.AlreadyStarted");
            return Err(ExporterError::AlreadyStarted);
        }
        if self
            .state
            .compare_exchange(UNSTARTED, STARTING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ClientError::AlreadyStopped.into());
        }

        if let Err(err) = self.client.start().await {
            let _ = self.state.compare_exchange(
                STARTING,
                START_FAILED,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            return Err(err.into());
        }

        match self
            .state
            .compare_exchange(STARTING, STARTED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                otel_debug!(name: "OtlpLogExporter.Started");
                Ok(())
            }
            Err(_) => {
                // `stop` ran while the client was starting and left the
                // teardown to us.
                otel_debug!(name: "OtlpLogExporter.StoppedWhileStarting");
                self.client.stop().await?;
                Err(ClientError::AlreadyStopped.into())
            }
        }
    }

    /// Stops the underlying client if it was started. Only the first call
    /// reaches it.
    pub async fn stop(&self) -> Result<(), ExporterError> {
        if self
            .stop_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        match self.state.swap(STOPPED, Ordering::AcqRel) {
            STARTED => {
                self.client.stop().await?;
                otel_debug!(name: "OtlpLogExporter.Stopped");
            }
            STARTING => {
                otel_debug!(name: "OtlpLogExporter.StopDeferredToStart");
            }
            _ => {}
        }
        Ok(())
    }

    /// Transforms `batch` and uploads it. An empty batch is a no-op.
    pub async fn export_logs(&self, batch: LogBatch<'_>) -> Result<(), ExporterError> {
        if batch.is_empty() {
            return Ok(());
        }

        let resource_logs = transform::resource_logs(&batch);
        self.client.upload_logs(resource_logs).await?;
        Ok(())
    }
}

impl LogExporter for OtlpLogExporter {
    #[allow(clippy::manual_async_fn)]
    fn export(&self, batch: LogBatch<'_>) -> impl Future<Output = SdkResult> + Send {
        async move {
            self.export_logs(batch)
                .await
                .map_err(|e| SdkError::InternalFailure(e.to_string()))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn shutdown(&self) -> impl Future<Output = SdkResult> + Send {
        async move {
            self.stop()
                .await
                .map_err(|e| SdkError::InternalFailure(e.to_string()))
        }
    }
}
