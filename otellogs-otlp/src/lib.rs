//! # OTLP log exporter
//!
//! Sends logs emitted through an [`otellogs_sdk`] logger provider to an
//! OpenTelemetry collector using the OpenTelemetry Protocol.
//!
//! Two transports are available:
//!
//! * HTTP, with protobuf (`http-proto`, default) or JSON (`http-json`)
//!   payloads, posted to `/v1/logs`.
//! * gRPC through [tonic] (`grpc-tonic`).
//!
//! Both retry transient failures with exponential backoff, honor the
//! collector's `Retry-After` throttling hints and report partial success
//! responses through the configured [`ErrorHandler`].
//!
//! ## Quickstart
//!
//! ```no_run
//! # #[cfg(all(feature = "http-proto", feature = "reqwest-client"))]
//! # {
//! use otellogs::logs::{LogRecord, Logger, LoggerProvider, Severity};
//! use otellogs_otlp::{OtlpLogExporter, WithExportConfig};
//! use otellogs_sdk::logs::SdkLoggerProvider;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let exporter = OtlpLogExporter::builder()
//!     .with_http()
//!     .with_endpoint("http://localhost:4318/v1/logs")
//!     .build()?;
//! exporter.start().await?;
//!
//! let provider = SdkLoggerProvider::builder()
//!     .with_batch_exporter(exporter)
//!     .build();
//!
//! let logger = provider.logger("checkout");
//! let mut record = logger.create_log_record();
//! record.set_severity_number(Severity::Info);
//! record.set_body("order placed".into());
//! logger.emit(record);
//!
//! provider.shutdown()?;
//! # Ok(())
//! # }
//! # }
//! ```
//!
//! An exporter must be started before it exports anything, and only the
//! first call to [`OtlpLogExporter::start`] takes effect. Shutting the
//! provider down stops the exporter.
//!
//! The bundled clients use Tokio timers and, for gRPC, a Tokio based
//! channel. The [`BatchLogProcessor`] runs its exports on a Tokio runtime
//! of its own. The [`SimpleLogProcessor`] does the same when records are
//! emitted outside a runtime and otherwise relies on the caller's.
//!
//! ## Feature flags
//!
//! * `http-proto`: HTTP transport with protobuf payloads (enabled by default).
//! * `http-json`: HTTP transport with JSON payloads.
//! * `reqwest-client`: use [reqwest] as the HTTP client (enabled by default).
//! * `gzip-http`: gzip compression for the HTTP transport.
//! * `grpc-tonic`: gRPC transport.
//! * `gzip-tonic`: gzip compression for the gRPC transport.
//! * `serialize`: serde support for [`Protocol`].
//! * `internal-logs`: emit the exporter's own diagnostics through `tracing`
//!   (enabled by default).
//!
//! [tonic]: https://github.com/hyperium/tonic
//! [reqwest]: https://docs.rs/reqwest
//! [`BatchLogProcessor`]: otellogs_sdk::logs::BatchLogProcessor
//! [`SimpleLogProcessor`]: otellogs_sdk::logs::SimpleLogProcessor
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod client;
mod exporter;
mod logs;
mod retry;
mod retry_classification;
pub mod transform;

pub use crate::client::{ClientError, ErrorHandler, LogsClient};
pub use crate::exporter::{
    Compression, ExportConfig, ExporterBuildError, HasExportConfig, Protocol, WithExportConfig,
    OTLP_TIMEOUT_DEFAULT,
};
pub use crate::logs::{ExporterError, LogExporterBuilder, NoExporterBuilderSet, OtlpLogExporter};
pub use crate::retry::RetryConfig;

#[cfg(any(feature = "http-proto", feature = "http-json"))]
pub use crate::exporter::http::{HasHttpConfig, HttpConfig, HttpExporterBuilder, WithHttpConfig};
#[cfg(any(feature = "http-proto", feature = "http-json"))]
pub use crate::logs::HttpExporterBuilderSet;

#[cfg(feature = "grpc-tonic")]
pub use crate::exporter::tonic::{
    HasTonicConfig, TonicConfig, TonicExporterBuilder, WithTonicConfig,
};
#[cfg(feature = "grpc-tonic")]
pub use crate::logs::TonicExporterBuilderSet;

/// Re-exported so custom [`LogsClient`] implementations can name the
/// request types.
pub use opentelemetry_proto;
