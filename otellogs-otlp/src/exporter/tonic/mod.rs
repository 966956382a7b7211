use std::fmt;

use otellogs::otel_debug;
use tonic::codec::CompressionEncoding;
use tonic::metadata::{KeyAndValueRef, MetadataKey, MetadataMap, MetadataValue};
use tonic::service::Interceptor;
use tonic::transport::{Channel, Endpoint};

use super::{
    default_headers, Compression, ExportConfig, ExporterBuildError, Protocol,
    OTLP_GRPC_ENDPOINT_DEFAULT, OTLP_TIMEOUT_DEFAULT,
};

pub(crate) mod logs;

/// gRPC specific settings of a [`TonicExporterBuilder`].
#[derive(Debug, Default)]
pub struct TonicConfig {
    /// Sent with every request, after the User-Agent.
    pub(crate) metadata: MetadataMap,
    pub(crate) compression: Option<Compression>,
    pub(crate) channel: Option<Channel>,
    pub(crate) interceptor: Option<RequestInterceptor>,
}

/// Builds the gRPC transport of an [`OtlpLogExporter`](crate::OtlpLogExporter).
///
/// The channel is connected lazily when the exporter starts, so building
/// needs no Tokio runtime.
///
/// ```no_run
/// # #[cfg(feature = "grpc-tonic")]
/// # {
/// use otellogs_otlp::{OtlpLogExporter, WithExportConfig};
///
/// let exporter = OtlpLogExporter::builder()
///     .with_tonic()
///     .with_endpoint("http://collector:4317")
///     .build()
///     .expect("valid configuration");
/// # }
/// ```
#[derive(Debug)]
pub struct TonicExporterBuilder {
    pub(crate) tonic_config: TonicConfig,
    pub(crate) exporter_config: ExportConfig,
}

/// Runs before every upload; owns the metadata and any user interceptor.
pub(crate) struct RequestInterceptor(Box<dyn Interceptor + Send + Sync>);

impl Interceptor for RequestInterceptor {
    fn call(&mut self, request: tonic::Request<()>) -> Result<tonic::Request<()>, tonic::Status> {
        self.0.call(request)
    }
}

impl fmt::Debug for RequestInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestInterceptor")
    }
}

/// Where the client gets its channel from once started.
#[derive(Debug)]
pub(crate) enum Transport {
    Endpoint(Endpoint),
    Channel(Channel),
}

impl Transport {
    fn into_channel(self) -> Channel {
        match self {
            Transport::Endpoint(endpoint) => endpoint.connect_lazy(),
            Transport::Channel(channel) => channel,
        }
    }
}

impl Default for TonicExporterBuilder {
    fn default() -> Self {
        let mut metadata = MetadataMap::new();
        for (key, value) in default_headers() {
            if let (Ok(key), Ok(value)) = (
                MetadataKey::from_bytes(key.to_ascii_lowercase().as_bytes()),
                MetadataValue::try_from(value.as_str()),
            ) {
                metadata.insert(key, value);
            }
        }
        TonicExporterBuilder {
            tonic_config: TonicConfig {
                metadata,
                ..TonicConfig::default()
            },
            exporter_config: ExportConfig {
                protocol: Protocol::Grpc,
                ..ExportConfig::default()
            },
        }
    }
}

fn compression_encoding(compression: Compression) -> Result<CompressionEncoding, ExporterBuildError> {
    match compression {
        #[cfg(feature = "gzip-tonic")]
        Compression::Gzip => Ok(CompressionEncoding::Gzip),
        #[cfg(not(feature = "gzip-tonic"))]
        Compression::Gzip => Err(ExporterBuildError::FeatureRequiredForCompressionAlgorithm(
            "gzip-tonic",
            Compression::Gzip,
        )),
    }
}

/// Appends `metadata` to each request, then hands it to `user`.
fn request_interceptor(
    metadata: MetadataMap,
    user: Option<RequestInterceptor>,
) -> RequestInterceptor {
    let with_metadata = move |mut request: tonic::Request<()>| {
        let target = request.metadata_mut();
        for entry in metadata.iter() {
            match entry {
                KeyAndValueRef::Ascii(key, value) => target.append(key, value.clone()),
                KeyAndValueRef::Binary(key, value) => target.append_bin(key, value.clone()),
            };
        }
        Ok::<_, tonic::Status>(request)
    };

    match user {
        Some(mut user) => {
            RequestInterceptor(Box::new(move |request| user.call(with_metadata(request)?)))
        }
        None => RequestInterceptor(Box::new(with_metadata)),
    }
}

impl TonicExporterBuilder {
    pub(crate) fn build_logs_client(self) -> Result<logs::TonicLogsClient, ExporterBuildError> {
        let TonicConfig {
            metadata,
            compression,
            channel,
            interceptor,
        } = self.tonic_config;
        let compression = compression.map(compression_encoding).transpose()?;
        let interceptor = request_interceptor(metadata, interceptor);

        let config = self.exporter_config;
        let timeout = config.timeout.unwrap_or(OTLP_TIMEOUT_DEFAULT);

        // A custom channel replaces the endpoint entirely.
        let transport = match channel {
            Some(channel) => Transport::Channel(channel),
            None => {
                let endpoint = config
                    .endpoint
                    .filter(|endpoint| !endpoint.is_empty())
                    .unwrap_or_else(|| OTLP_GRPC_ENDPOINT_DEFAULT.to_string());
                let channel_endpoint = Channel::from_shared(endpoint.clone())
                    .map_err(|e| ExporterBuildError::InvalidUri(endpoint.clone(), e.to_string()))?
                    .timeout(timeout);

                otel_debug!(
                    name: "TonicLogsClient.Built",
                    endpoint = endpoint,
                    timeout_ms = timeout.as_millis() as u64,
                    compression = format!("{compression:?}")
                );
                Transport::Endpoint(channel_endpoint)
            }
        };

        Ok(logs::TonicLogsClient::new(
            transport,
            interceptor,
            compression,
            timeout,
            config.retry,
            config.error_handler.unwrap_or_default(),
        ))
    }
}

/// Builders that carry a [`TonicConfig`].
pub trait HasTonicConfig {
    /// The builder's [`TonicConfig`].
    fn tonic_config(&mut self) -> &mut TonicConfig;
}

impl HasTonicConfig for TonicExporterBuilder {
    fn tonic_config(&mut self) -> &mut TonicConfig {
        &mut self.tonic_config
    }
}

/// gRPC setters for any [`HasTonicConfig`] builder.
///
/// ```
/// # #[cfg(all(feature = "grpc-tonic", feature = "gzip-tonic"))]
/// # {
/// use otellogs_otlp::{Compression, OtlpLogExporter, WithTonicConfig};
///
/// let builder = OtlpLogExporter::builder()
///     .with_tonic()
///     .with_compression(Compression::Gzip);
/// # }
/// ```
pub trait WithTonicConfig {
    /// Add metadata to every request. Keys already present, including
    /// `user-agent`, are replaced.
    fn with_metadata(self, metadata: MetadataMap) -> Self;

    /// Compress request bodies.
    fn with_compression(self, compression: Compression) -> Self;

    /// Send over `channel` instead of connecting to the endpoint. The
    /// channel's own timeout should match [`ExportConfig::timeout`].
    fn with_channel(self, channel: Channel) -> Self;

    /// Run `interceptor` on every request after the metadata is attached,
    /// e.g. to add an auth token.
    fn with_interceptor<I>(self, interceptor: I) -> Self
    where
        I: Interceptor + Clone + Send + Sync + 'static;
}

impl<B: HasTonicConfig> WithTonicConfig for B {
    fn with_metadata(mut self, metadata: MetadataMap) -> Self {
        let current = std::mem::take(&mut self.tonic_config().metadata);
        let mut headers = current.into_headers();
        headers.extend(metadata.into_headers());
        self.tonic_config().metadata = MetadataMap::from_headers(headers);
        self
    }

    fn with_compression(mut self, compression: Compression) -> Self {
        self.tonic_config().compression = Some(compression);
        self
    }

    fn with_channel(mut self, channel: Channel) -> Self {
        self.tonic_config().channel = Some(channel);
        self
    }

    fn with_interceptor<I>(mut self, interceptor: I) -> Self
    where
        I: Interceptor + Clone + Send + Sync + 'static,
    {
        self.tonic_config().interceptor = Some(RequestInterceptor(Box::new(interceptor)));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WithExportConfig;

    fn metadata(pairs: &[(&'static str, &'static str)]) -> MetadataMap {
        let mut map = MetadataMap::new();
        for (key, value) in pairs {
            map.insert(*key, MetadataValue::from_static(*value));
        }
        map
    }

    fn value<'a>(map: &'a MetadataMap, key: &str) -> Option<&'a str> {
        map.get(key).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn user_agent_is_sent_by_default() {
        let builder = TonicExporterBuilder::default();

        let agent = value(&builder.tonic_config.metadata, "user-agent").unwrap();
        assert!(agent.starts_with("OTel-OTLP-Exporter-Rust/"));
    }

    #[test]
    fn added_metadata_merges_and_overrides() {
        let builder = TonicExporterBuilder::default()
            .with_metadata(metadata(&[("x-tenant", "blue")]))
            .with_metadata(metadata(&[("user-agent", "billing/1.0"), ("x-region", "eu")]));

        let merged = &builder.tonic_config.metadata;
        assert_eq!(merged.len(), 3);
        assert_eq!(value(merged, "x-tenant"), Some("blue"));
        assert_eq!(value(merged, "user-agent"), Some("billing/1.0"));
    }

    #[test]
    fn interceptor_sees_the_metadata() {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(None));
        let sink = std::sync::Arc::clone(&seen);
        let user = RequestInterceptor(Box::new(move |request: tonic::Request<()>| {
            *sink.lock().unwrap() = request
                .metadata()
                .get("x-tenant")
                .map(|v| v.to_str().unwrap().to_string());
            Ok(request)
        }));

        let mut interceptor = request_interceptor(metadata(&[("x-tenant", "blue")]), Some(user));
        let request = interceptor.call(tonic::Request::new(())).unwrap();

        assert_eq!(seen.lock().unwrap().as_deref(), Some("blue"));
        assert_eq!(value(request.metadata(), "x-tenant"), Some("blue"));
    }

    #[test]
    fn gzip_depends_on_its_feature() {
        let result = compression_encoding(Compression::Gzip);
        if cfg!(feature = "gzip-tonic") {
            assert!(result.is_ok());
        } else {
            assert!(matches!(
                result,
                Err(ExporterBuildError::FeatureRequiredForCompressionAlgorithm(
                    "gzip-tonic",
                    Compression::Gzip
                ))
            ));
        }
    }

    #[test]
    fn default_endpoint_has_no_signal_path() {
        let client = TonicExporterBuilder::default().build_logs_client().unwrap();

        let uri = client.endpoint_uri().unwrap();
        assert_eq!(uri.scheme_str(), Some("http"));
        assert_eq!(uri.authority().map(|a| a.as_str()), Some("localhost:4317"));
        assert!(matches!(uri.path(), "" | "/"));
    }

    #[test]
    fn provided_endpoint_is_used() {
        let client = TonicExporterBuilder::default()
            .with_endpoint("http://localhost:1234")
            .build_logs_client()
            .unwrap();

        let uri = client.endpoint_uri().unwrap();
        assert_eq!(uri.authority().map(|a| a.as_str()), Some("localhost:1234"));
    }

    #[test]
    fn invalid_endpoint_is_a_build_error() {
        let result = TonicExporterBuilder::default()
            .with_endpoint("invalid_uri/something")
            .build_logs_client();

        assert!(matches!(result, Err(ExporterBuildError::InvalidUri(_, _))));
    }
}
