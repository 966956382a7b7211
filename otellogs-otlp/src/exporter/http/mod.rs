use super::{
    default_headers, parse_header_string, Compression, ExportConfig, ExporterBuildError,
    Protocol, OTLP_HTTP_ENDPOINT_DEFAULT, OTLP_TIMEOUT_DEFAULT,
};
use crate::client::{ClientError, ErrorHandler, Lifecycle};
use crate::retry::RetryConfig;
use http::{HeaderName, HeaderValue, Uri};
use opentelemetry_proto::tonic::collector::logs::v1::{
    ExportLogsServiceRequest, ExportLogsServiceResponse,
};
use opentelemetry_proto::tonic::logs::v1::ResourceLogs;
use otellogs::otel_debug;
use otellogs_http::HttpClient;
use prost::Message;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

mod logs;

const LOGS_PATH: &str = "/v1/logs";

/// Configuration of the http transport
#[derive(Debug)]
#[cfg_attr(not(feature = "reqwest-client"), derive(Default))]
pub struct HttpConfig {
    /// Select the HTTP client
    client: Option<Arc<dyn HttpClient>>,

    /// Additional headers to send to the collector.
    headers: Option<HashMap<String, String>>,

    /// The compression algorithm to use when communicating with the collector.
    compression: Option<Compression>,
}

#[cfg(feature = "reqwest-client")]
impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            client: Some(Arc::new(reqwest::Client::new())),
            headers: None,
            compression: None,
        }
    }
}

/// Configuration for the OTLP HTTP log exporter.
///
/// ## Examples
///
/// ```no_run
/// # #[cfg(feature = "http-proto")]
/// # {
/// use otellogs_otlp::{OtlpLogExporter, WithExportConfig, WithHttpConfig};
/// use std::time::Duration;
///
/// let exporter = OtlpLogExporter::builder()
///     .with_http()
///     .with_endpoint("http://collector:4318/v1/logs")
///     .with_timeout(Duration::from_secs(5))
///     .build()
///     .expect("valid configuration");
/// # }
/// ```
#[derive(Debug)]
pub struct HttpExporterBuilder {
    pub(crate) exporter_config: ExportConfig,
    pub(crate) http_config: HttpConfig,
}

impl Default for HttpExporterBuilder {
    fn default() -> Self {
        HttpExporterBuilder {
            exporter_config: ExportConfig::default(),
            http_config: HttpConfig {
                headers: Some(default_headers()),
                ..HttpConfig::default()
            },
        }
    }
}

impl HttpExporterBuilder {
    pub(crate) fn build_logs_client(mut self) -> Result<HttpLogsClient, ExporterBuildError> {
        let endpoint = match self.exporter_config.endpoint.as_deref() {
            Some(endpoint) if !endpoint.is_empty() => endpoint
                .parse::<Uri>()
                .map_err(|e| ExporterBuildError::InvalidUri(endpoint.to_string(), e.to_string()))?,
            _ => build_endpoint_uri(OTLP_HTTP_ENDPOINT_DEFAULT, LOGS_PATH)?,
        };

        let timeout = self.exporter_config.timeout.unwrap_or(OTLP_TIMEOUT_DEFAULT);

        let http_client = self
            .http_config
            .client
            .take()
            .ok_or(ExporterBuildError::NoHttpClient)?;

        let compression = self.resolve_compression()?;

        #[allow(clippy::mutable_key_type)] // http headers are not mutated
        let headers: HashMap<HeaderName, HeaderValue> = self
            .http_config
            .headers
            .take()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(k, v)| {
                Some((
                    HeaderName::from_str(&k).ok()?,
                    HeaderValue::from_str(&v).ok()?,
                ))
            })
            .collect();

        otel_debug!(
            name: "HttpLogsClient.Built",
            endpoint = endpoint.to_string(),
            protocol = self.exporter_config.protocol.to_string(),
            timeout_ms = timeout.as_millis() as u64
        );

        Ok(HttpLogsClient::new(
            http_client,
            endpoint,
            headers,
            self.exporter_config.protocol,
            compression,
            timeout,
            self.exporter_config.retry,
            self.exporter_config.error_handler.unwrap_or_default(),
        ))
    }

    fn resolve_compression(&self) -> Result<Option<Compression>, ExporterBuildError> {
        match self.http_config.compression {
            #[cfg(feature = "gzip-http")]
            Some(Compression::Gzip) => Ok(Some(Compression::Gzip)),
            #[cfg(not(feature = "gzip-http"))]
            Some(Compression::Gzip) => Err(ExporterBuildError::FeatureRequiredForCompressionAlgorithm(
                "gzip-http",
                Compression::Gzip,
            )),
            None => Ok(None),
        }
    }
}

/// The HTTP implementation of [`LogsClient`](crate::LogsClient).
///
/// Starting is a no-op. Stopping cancels pending uploads and drops the
/// underlying [`HttpClient`].
#[derive(Debug)]
pub(crate) struct HttpLogsClient {
    client: Mutex<Option<Arc<dyn HttpClient>>>,
    collector_endpoint: Uri,
    headers: HashMap<HeaderName, HeaderValue>,
    protocol: Protocol,
    compression: Option<Compression>,
    timeout: Duration,
    retry: RetryConfig,
    error_handler: ErrorHandler,
    lifecycle: Lifecycle,
}

impl HttpLogsClient {
    #[allow(clippy::mutable_key_type)] // http headers are not mutated
    #[allow(clippy::too_many_arguments)]
    fn new(
        client: Arc<dyn HttpClient>,
        collector_endpoint: Uri,
        headers: HashMap<HeaderName, HeaderValue>,
        protocol: Protocol,
        compression: Option<Compression>,
        timeout: Duration,
        retry: RetryConfig,
        error_handler: ErrorHandler,
    ) -> Self {
        let lifecycle = Lifecycle::new();
        lifecycle.mark_started();
        HttpLogsClient {
            client: Mutex::new(Some(client)),
            collector_endpoint,
            headers,
            protocol,
            compression,
            timeout,
            retry,
            error_handler,
            lifecycle,
        }
    }

    fn build_logs_export_body(
        &self,
        resource_logs: Vec<ResourceLogs>,
    ) -> Result<(Vec<u8>, &'static str, Option<&'static str>), ClientError> {
        let req = ExportLogsServiceRequest { resource_logs };
        let (body, content_type) = match self.protocol {
            #[cfg(feature = "http-json")]
            Protocol::HttpJson => match serde_json::to_vec(&req) {
                Ok(json) => (json, "application/json"),
                Err(e) => return Err(ClientError::Encode(e.to_string())),
            },
            _ => (req.encode_to_vec(), "application/x-protobuf"),
        };

        let (body, content_encoding) = self.process_body(body)?;
        Ok((body, content_type, content_encoding))
    }

    fn process_body(&self, body: Vec<u8>) -> Result<(Vec<u8>, Option<&'static str>), ClientError> {
        match self.compression {
            #[cfg(feature = "gzip-http")]
            Some(Compression::Gzip) => {
                use flate2::{write::GzEncoder, Compression as GzLevel};
                use std::io::Write;

                let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
                encoder
                    .write_all(&body)
                    .map_err(|e| ClientError::Encode(e.to_string()))?;
                let compressed = encoder
                    .finish()
                    .map_err(|e| ClientError::Encode(e.to_string()))?;
                Ok((compressed, Some("gzip")))
            }
            #[cfg(not(feature = "gzip-http"))]
            Some(Compression::Gzip) => Err(ClientError::Encode(
                "feature 'gzip-http' is required to use gzip compression".to_string(),
            )),
            None => Ok((body, None)),
        }
    }

    fn decode_response(&self, body: &[u8]) -> Result<ExportLogsServiceResponse, ClientError> {
        match self.protocol {
            #[cfg(feature = "http-json")]
            Protocol::HttpJson => {
                serde_json::from_slice(body).map_err(|e| ClientError::Decode(e.to_string()))
            }
            _ => ExportLogsServiceResponse::decode(body)
                .map_err(|e| ClientError::Decode(e.to_string())),
        }
    }
}

fn build_endpoint_uri(endpoint: &str, path: &str) -> Result<Uri, ExporterBuildError> {
    let path = if endpoint.ends_with('/') && path.starts_with('/') {
        path.strip_prefix('/').unwrap_or(path)
    } else {
        path
    };
    let endpoint = format!("{endpoint}{path}");
    endpoint
        .parse()
        .map_err(|e: http::uri::InvalidUri| ExporterBuildError::InvalidUri(endpoint, e.to_string()))
}

/// Expose interface for modifying builder config.
pub trait HasHttpConfig {
    /// Return a mutable reference to the config within the exporter builders.
    fn http_client_config(&mut self) -> &mut HttpConfig;
}

impl HasHttpConfig for HttpExporterBuilder {
    fn http_client_config(&mut self) -> &mut HttpConfig {
        &mut self.http_config
    }
}

/// This trait will be implemented for every struct that implemented [`HasHttpConfig`] trait.
///
/// ## Examples
/// ```
/// # #[cfg(all(feature = "http-proto", feature = "gzip-http"))]
/// # {
/// use otellogs_otlp::{Compression, OtlpLogExporter, WithHttpConfig};
///
/// let exporter_builder = OtlpLogExporter::builder()
///     .with_http()
///     .with_headers_from_string("x-tenant=blue,authorization=Basic%20AAA")
///     .with_compression(Compression::Gzip);
/// # }
/// ```
pub trait WithHttpConfig {
    /// Assign client implementation
    fn with_http_client<T: HttpClient + 'static>(self, client: T) -> Self;

    /// Set additional headers to send to the collector. Values are
    /// percent-decoded when they decode cleanly.
    fn with_headers(self, headers: HashMap<String, String>) -> Self;

    /// Add headers given as `k1=v1,k2=v2`. Malformed entries are skipped.
    fn with_headers_from_string(self, headers: &str) -> Self;

    /// Set the compression algorithm to use when communicating with the collector.
    fn with_compression(self, compression: Compression) -> Self;
}

impl<B: HasHttpConfig> WithHttpConfig for B {
    fn with_http_client<T: HttpClient + 'static>(mut self, client: T) -> Self {
        self.http_client_config().client = Some(Arc::new(client));
        self
    }

    fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        // headers will be wrapped, so we must do some logic to unwrap first.
        let http_client_headers = self
            .http_client_config()
            .headers
            .get_or_insert(HashMap::new());
        headers.into_iter().for_each(|(key, value)| {
            let value = super::url_decode(&value).unwrap_or(value);
            http_client_headers.insert(key, value);
        });
        self
    }

    fn with_headers_from_string(mut self, input: &str) -> Self {
        let http_client_headers = self
            .http_client_config()
            .headers
            .get_or_insert(HashMap::new());
        http_client_headers.extend(
            parse_header_string(input).map(|(key, value)| (key.to_string(), value)),
        );
        self
    }

    fn with_compression(mut self, compression: Compression) -> Self {
        self.http_client_config().compression = Some(compression);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WithExportConfig;

    #[test]
    fn test_build_endpoint_uri() {
        let uri = build_endpoint_uri("https://example.com", "/v1/logs").unwrap();
        assert_eq!(uri, "https://example.com/v1/logs");

        // Should be no duplicate slashes:
        let uri = build_endpoint_uri("https://example.com/", "/v1/logs").unwrap();
        assert_eq!(uri, "https://example.com/v1/logs");

        // Append paths properly:
        let uri = build_endpoint_uri("https://example.com/additional/path/", "/v1/logs").unwrap();
        assert_eq!(uri, "https://example.com/additional/path/v1/logs");
    }

    #[test]
    fn invalid_endpoint_is_a_build_error() {
        let result = build_endpoint_uri("-*/*-/*-//-/-/yet-another-invalid-uri", "/v1/logs");
        assert!(matches!(result, Err(ExporterBuildError::InvalidUri(_, _))));
    }

    #[test]
    fn default_endpoint_targets_the_logs_path() {
        let client = HttpExporterBuilder::default()
            .with_http_client(NeverCalled)
            .build_logs_client()
            .unwrap();

        assert_eq!(client.collector_endpoint, "http://localhost:4318/v1/logs");
        assert_eq!(client.timeout, Duration::from_secs(10));
    }

    #[test]
    fn provided_endpoint_is_used_verbatim() {
        let client = HttpExporterBuilder::default()
            .with_http_client(NeverCalled)
            .with_endpoint("http://collector:9999/custom")
            .build_logs_client()
            .unwrap();

        assert_eq!(client.collector_endpoint, "http://collector:9999/custom");
    }

    #[test]
    fn default_headers_carry_the_user_agent() {
        let client = HttpExporterBuilder::default()
            .with_http_client(NeverCalled)
            .with_headers(HashMap::from([(
                "authorization".to_string(),
                "Basic%20AAA".to_string(),
            )]))
            .build_logs_client()
            .unwrap();

        assert!(client
            .headers
            .get(&HeaderName::from_static("user-agent"))
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("OTel-OTLP-Exporter-Rust/")));
        assert_eq!(
            client
                .headers
                .get(&HeaderName::from_static("authorization")),
            Some(&HeaderValue::from_static("Basic AAA"))
        );
    }

    #[test]
    fn headers_from_string_are_merged() {
        let client = HttpExporterBuilder::default()
            .with_http_client(NeverCalled)
            .with_headers_from_string("k1=v1,bad,k2=v%202")
            .build_logs_client()
            .unwrap();

        assert_eq!(client.headers.len(), 3);
        assert_eq!(
            client.headers.get(&HeaderName::from_static("k2")),
            Some(&HeaderValue::from_static("v 2"))
        );
    }

    #[cfg(not(feature = "reqwest-client"))]
    #[test]
    fn missing_http_client_is_a_build_error() {
        let result = HttpExporterBuilder::default().build_logs_client();
        assert!(matches!(result, Err(ExporterBuildError::NoHttpClient)));
    }

    #[cfg(not(feature = "gzip-http"))]
    #[test]
    fn gzip_requires_its_feature() {
        let result = HttpExporterBuilder::default()
            .with_http_client(NeverCalled)
            .with_compression(Compression::Gzip)
            .build_logs_client();

        assert!(matches!(
            result,
            Err(ExporterBuildError::FeatureRequiredForCompressionAlgorithm(
                "gzip-http",
                Compression::Gzip
            ))
        ));
    }

    fn string_headers(client: &HttpLogsClient) -> HashMap<&str, &str> {
        client
            .headers
            .iter()
            .filter(|(k, _)| k.as_str() != "user-agent")
            .map(|(k, v)| (k.as_str(), v.to_str().unwrap()))
            .collect()
    }

    #[test]
    fn header_strings_skip_malformed_entries() {
        let test_cases = vec![
            ("k1=v1", vec![("k1", "v1")]),
            ("k1=v1,k2=v2", vec![("k1", "v1"), ("k2", "v2")]),
            ("k1=v1=10,k2,k3", vec![("k1", "v1=10")]),
            ("k1=v1,,,k2,k3=10", vec![("k1", "v1"), ("k3", "10")]),
        ];

        for (input, expected) in test_cases {
            let client = HttpExporterBuilder::default()
                .with_http_client(NeverCalled)
                .with_headers_from_string(input)
                .build_logs_client()
                .unwrap();

            assert_eq!(
                string_headers(&client),
                expected.into_iter().collect::<HashMap<_, _>>(),
                "input: {input}"
            );
        }
    }

    #[test]
    fn later_header_strings_override_earlier_ones() {
        let client = HttpExporterBuilder::default()
            .with_http_client(NeverCalled)
            .with_headers_from_string("k1=v1,k2=v2")
            .with_headers_from_string("k1=v1_new")
            .with_headers_from_string("k3=val=10,22,34,k4=,k5=10")
            .build_logs_client()
            .unwrap();

        assert_eq!(
            string_headers(&client),
            HashMap::from([("k1", "v1_new"), ("k2", "v2"), ("k3", "val=10"), ("k5", "10")])
        );
    }

    #[derive(Debug)]
    struct NeverCalled;

    #[async_trait::async_trait]
    impl HttpClient for NeverCalled {
        async fn send_bytes(
            &self,
            _request: otellogs_http::Request<otellogs_http::Bytes>,
        ) -> Result<otellogs_http::Response<otellogs_http::Bytes>, otellogs_http::HttpError>
        {
            Err("no network in this test".into())
        }
    }
}
