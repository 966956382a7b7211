//! OTLP exporter builders and their shared configuration.
//!
//! Logs can be sent over HTTP, as protobuf or JSON, or over gRPC.

#[cfg(any(feature = "http-proto", feature = "http-json"))]
use crate::exporter::http::HttpExporterBuilder;
#[cfg(feature = "grpc-tonic")]
use crate::exporter::tonic::TonicExporterBuilder;
use crate::client::ErrorHandler;
use crate::retry::RetryConfig;
use otellogs::logs::LogError;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default max waiting time for one export request, retries included.
pub const OTLP_TIMEOUT_DEFAULT: Duration = Duration::from_secs(10);

#[cfg(feature = "grpc-tonic")]
pub(crate) const OTLP_GRPC_ENDPOINT_DEFAULT: &str = "http://localhost:4317";
#[cfg(any(feature = "http-proto", feature = "http-json"))]
pub(crate) const OTLP_HTTP_ENDPOINT_DEFAULT: &str = "http://localhost:4318";

#[cfg(any(feature = "http-proto", feature = "http-json"))]
pub(crate) mod http;
#[cfg(feature = "grpc-tonic")]
pub(crate) mod tonic;

/// How log batches are put on the wire.
#[cfg_attr(feature = "serialize", derive(Deserialize, Serialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Protocol {
    /// gRPC with protobuf payloads.
    Grpc,
    /// HTTP with protobuf payloads.
    HttpBinary,
    /// HTTP with JSON payloads.
    HttpJson,
}

/// `http/json` when that feature is on, else `http/protobuf`, else `grpc`.
#[cfg(any(feature = "grpc-tonic", feature = "http-proto", feature = "http-json"))]
impl Default for Protocol {
    fn default() -> Self {
        #[cfg(feature = "http-json")]
        return Protocol::HttpJson;

        #[cfg(all(feature = "http-proto", not(feature = "http-json")))]
        return Protocol::HttpBinary;

        #[cfg(all(
            feature = "grpc-tonic",
            not(any(feature = "http-proto", feature = "http-json"))
        ))]
        return Protocol::Grpc;
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Protocol::Grpc => "grpc",
            Protocol::HttpBinary => "http/protobuf",
            Protocol::HttpJson => "http/json",
        })
    }
}

impl FromStr for Protocol {
    type Err = ExporterBuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "grpc" => Ok(Protocol::Grpc),
            "http/protobuf" => Ok(Protocol::HttpBinary),
            "http/json" => Ok(Protocol::HttpJson),
            other => Err(ExporterBuildError::InvalidConfig {
                name: "protocol".to_string(),
                reason: format!("unknown protocol '{other}'"),
            }),
        }
    }
}

/// Settings every OTLP transport understands.
#[derive(Debug)]
pub struct ExportConfig {
    /// Collector address. Each transport has its own default.
    pub endpoint: Option<String>,

    /// Payload format; see [`Protocol`].
    pub protocol: Protocol,

    /// Budget for one export, retries included. Defaults to 10 seconds.
    pub timeout: Option<Duration>,

    /// How failed uploads are retried.
    pub retry: RetryConfig,

    /// Where partial successes are reported. Defaults to
    /// [`otellogs::global::handle_error`].
    pub error_handler: Option<ErrorHandler>,
}

#[cfg(any(feature = "grpc-tonic", feature = "http-proto", feature = "http-json"))]
impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            protocol: Protocol::default(),
            timeout: None,
            retry: RetryConfig::default(),
            error_handler: None,
        }
    }
}

/// Why an exporter could not be built.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ExporterBuildError {
    /// Compression was requested but its cargo feature is off.
    #[error("feature '{0}' is required to use the compression algorithm '{1}'")]
    FeatureRequiredForCompressionAlgorithm(&'static str, Compression),

    /// The HTTP transport has no client to send with.
    #[error("no http client specified")]
    NoHttpClient,

    /// A compression name that is not recognised.
    #[error("unsupported compression algorithm '{0}'")]
    UnsupportedCompressionAlgorithm(String),

    /// The endpoint does not parse as a URI: the endpoint, then the parser's
    /// message.
    #[error("invalid URI {0}. Reason {1}")]
    InvalidUri(String, String),

    /// A setting holds a value the exporter cannot use.
    #[error("{name}: {reason}")]
    InvalidConfig {
        /// Setting name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Payload compression.
#[cfg_attr(feature = "serialize", derive(Deserialize, Serialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Compression {
    /// gzip, sent as `Content-Encoding: gzip` or gRPC's `gzip` encoding.
    Gzip,
}

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Compression::Gzip => "gzip",
        })
    }
}

impl FromStr for Compression {
    type Err = ExporterBuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "gzip" => Ok(Compression::Gzip),
            other => Err(ExporterBuildError::UnsupportedCompressionAlgorithm(
                other.to_string(),
            )),
        }
    }
}

/// Headers every transport sends: the exporter's User-Agent.
#[cfg(any(feature = "grpc-tonic", feature = "http-proto", feature = "http-json"))]
fn default_headers() -> std::collections::HashMap<String, String> {
    std::collections::HashMap::from([(
        "User-Agent".to_string(),
        format!("OTel-OTLP-Exporter-Rust/{}", env!("CARGO_PKG_VERSION")),
    )])
}

/// Builders that carry an [`ExportConfig`].
pub trait HasExportConfig {
    /// The builder's [`ExportConfig`].
    fn export_config(&mut self) -> &mut ExportConfig;
}

#[cfg(feature = "grpc-tonic")]
impl HasExportConfig for TonicExporterBuilder {
    fn export_config(&mut self) -> &mut ExportConfig {
        &mut self.exporter_config
    }
}

#[cfg(any(feature = "http-proto", feature = "http-json"))]
impl HasExportConfig for HttpExporterBuilder {
    fn export_config(&mut self) -> &mut ExportConfig {
        &mut self.exporter_config
    }
}

/// Setters for the [`ExportConfig`] of any [`HasExportConfig`] builder.
///
/// ```
/// # #[cfg(feature = "http-proto")]
/// # {
/// use otellogs_otlp::{OtlpLogExporter, WithExportConfig};
/// use std::time::Duration;
///
/// let builder = OtlpLogExporter::builder()
///     .with_http()
///     .with_endpoint("http://collector:4318/v1/logs")
///     .with_timeout(Duration::from_secs(3));
/// # }
/// ```
pub trait WithExportConfig {
    /// Collector address. Empty or unset means the transport's default.
    fn with_endpoint<T: Into<String>>(self, endpoint: T) -> Self;
    /// Wire protocol. The HTTP builder uses it to pick protobuf or JSON
    /// bodies; the gRPC builder ignores it.
    fn with_protocol(self, protocol: Protocol) -> Self;
    /// Budget for one export, retries included.
    fn with_timeout(self, timeout: Duration) -> Self;
    /// Retry policy for failed uploads.
    fn with_retry_config(self, retry: RetryConfig) -> Self;
    /// Route partial successes to `handler` instead of the global error
    /// handler.
    fn with_error_handler<F>(self, handler: F) -> Self
    where
        F: Fn(LogError) + Send + Sync + 'static;
    /// Replace the whole [`ExportConfig`].
    fn with_export_config(self, export_config: ExportConfig) -> Self;
}

impl<B: HasExportConfig> WithExportConfig for B {
    fn with_endpoint<T: Into<String>>(mut self, endpoint: T) -> Self {
        self.export_config().endpoint = Some(endpoint.into());
        self
    }

    fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.export_config().protocol = protocol;
        self
    }

    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.export_config().timeout = Some(timeout);
        self
    }

    fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.export_config().retry = retry;
        self
    }

    fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(LogError) + Send + Sync + 'static,
    {
        self.export_config().error_handler = Some(ErrorHandler::new(handler));
        self
    }

    fn with_export_config(mut self, export_config: ExportConfig) -> Self {
        *self.export_config() = export_config;
        self
    }
}

/// Splits `k1=v1,k2=v2` into percent-decoded pairs. Entries without `=`,
/// or with an empty key or value, are dropped.
#[cfg(any(feature = "grpc-tonic", feature = "http-proto", feature = "http-json"))]
fn parse_header_string(input: &str) -> impl Iterator<Item = (&str, String)> {
    input.split(',').filter_map(|entry| {
        let (key, value) = entry.split_once('=')?;
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            return None;
        }
        Some((key, url_decode(value).unwrap_or_else(|| value.to_string())))
    })
}

/// Decodes `%XX` escapes. None if an escape is malformed or the bytes are
/// not UTF-8.
#[cfg(any(feature = "grpc-tonic", feature = "http-proto", feature = "http-json"))]
fn url_decode(value: &str) -> Option<String> {
    let mut decoded = Vec::with_capacity(value.len());
    let mut bytes = value.bytes();

    while let Some(byte) = bytes.next() {
        if byte == b'%' {
            let hex = [bytes.next()?, bytes.next()?];
            let hex = std::str::from_utf8(&hex).ok()?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
        } else {
            decoded.push(byte);
        }
    }

    String::from_utf8(decoded).ok()
}

#[cfg(test)]
#[cfg(any(feature = "grpc-tonic", feature = "http-proto", feature = "http-json"))]
mod tests {
    use super::*;
    use rstest::rstest;

    #[cfg(any(feature = "http-proto", feature = "http-json"))]
    #[test]
    fn malformed_http_endpoint_fails_the_build() {
        use crate::{OtlpLogExporter, WithExportConfig};

        let result = OtlpLogExporter::builder()
            .with_http()
            .with_export_config(ExportConfig {
                endpoint: Some("collector without scheme/logs".to_string()),
                protocol: Protocol::HttpBinary,
                ..ExportConfig::default()
            })
            .build();

        assert!(
            matches!(result, Err(ExporterBuildError::InvalidUri(_, _))),
            "got {result:?}"
        );
    }

    #[cfg(feature = "grpc-tonic")]
    #[tokio::test]
    async fn malformed_grpc_endpoint_fails_the_build() {
        use crate::{OtlpLogExporter, WithExportConfig};

        let result = OtlpLogExporter::builder()
            .with_tonic()
            .with_endpoint("collector without scheme")
            .build();

        assert!(matches!(result, Err(ExporterBuildError::InvalidUri(_, _))));
    }

    #[test]
    fn config_starts_without_endpoint_or_timeout() {
        let config = ExportConfig::default();

        assert_eq!(config.endpoint, None);
        assert_eq!(config.timeout, None);
        assert_eq!(config.retry, RetryConfig::default());
        assert!(config.error_handler.is_none());
    }

    #[test]
    fn default_protocol_follows_features() {
        let expected = if cfg!(feature = "http-json") {
            Protocol::HttpJson
        } else if cfg!(feature = "http-proto") {
            Protocol::HttpBinary
        } else {
            Protocol::Grpc
        };
        assert_eq!(Protocol::default(), expected);
    }

    #[rstest]
    #[case(Protocol::Grpc, "grpc")]
    #[case(Protocol::HttpBinary, "http/protobuf")]
    #[case(Protocol::HttpJson, "http/json")]
    fn protocol_names(#[case] protocol: Protocol, #[case] name: &str) {
        assert_eq!(protocol.to_string(), name);
        assert_eq!(name.parse::<Protocol>().unwrap(), protocol);
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(matches!(
            "http/xml".parse::<Protocol>(),
            Err(ExporterBuildError::InvalidConfig { .. })
        ));
        assert!(matches!(
            "zstd".parse::<Compression>(),
            Err(ExporterBuildError::UnsupportedCompressionAlgorithm(name)) if name == "zstd"
        ));
        assert_eq!(" gzip ".parse::<Compression>().unwrap(), Compression::Gzip);
    }

    #[test]
    fn user_agent_names_the_crate_version() {
        assert_eq!(
            default_headers().get("User-Agent").map(String::as_str),
            Some(concat!("OTel-OTLP-Exporter-Rust/", env!("CARGO_PKG_VERSION")))
        );
    }

    #[rstest]
    #[case("tenant%3Dblue", Some("tenant=blue"))]
    #[case("plain value", Some("plain value"))]
    #[case("%C3%A9t%C3%A9", Some("été"))]
    #[case("bad%ZZescape", None)]
    #[case("cut%4", None)]
    #[case("%FF", None)]
    fn percent_decoding(#[case] encoded: &str, #[case] decoded: Option<&str>) {
        assert_eq!(url_decode(encoded).as_deref(), decoded);
    }

    #[rstest]
    #[case("authorization=Basic%20AAA", &[("authorization", "Basic AAA")])]
    #[case(" a = 1 , b=2 ", &[("a", "1"), ("b", "2")])]
    #[case("a=1=2,b,c", &[("a", "1=2")])]
    #[case("a=,=b,,c=%ZZ", &[("c", "%ZZ")])]
    #[case("", &[])]
    fn header_strings(#[case] input: &str, #[case] expected: &[(&str, &str)]) {
        let parsed: Vec<_> = parse_header_string(input).collect();
        let expected: Vec<_> = expected.iter().map(|(k, v)| (*k, v.to_string())).collect();
        assert_eq!(parsed, expected);
    }
}
