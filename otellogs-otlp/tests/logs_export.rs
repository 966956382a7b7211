//! End to end: records emitted through the SDK provider reach a collector.

use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::common::v1::any_value::Value;
use opentelemetry_proto::tonic::logs::v1::LogRecord as ProtoLogRecord;
use otellogs::logs::{LogRecord, Logger, LoggerProvider, Severity};
use otellogs_sdk::logs::SdkLoggerProvider;
use otellogs_sdk::Resource;

fn emit(provider: &SdkLoggerProvider, bodies: &[&'static str]) {
    let logger = provider.logger("integration");
    for body in bodies {
        let mut record = logger.create_log_record();
        record.set_severity_number(Severity::Warn);
        record.set_body((*body).into());
        logger.emit(record);
    }
}

fn body_of(record: &ProtoLogRecord) -> Option<&str> {
    match record.body.as_ref()?.value.as_ref()? {
        Value::StringValue(s) => Some(s.as_str()),
        _ => None,
    }
}

fn bodies(requests: &[ExportLogsServiceRequest]) -> Vec<String> {
    requests
        .iter()
        .flat_map(|req| req.resource_logs.iter())
        .flat_map(|rl| rl.scope_logs.iter())
        .flat_map(|sl| sl.log_records.iter())
        .filter_map(|r| body_of(r).map(str::to_string))
        .collect()
}

fn service_name(request: &ExportLogsServiceRequest) -> Option<String> {
    let resource = request.resource_logs.first()?.resource.as_ref()?;
    resource
        .attributes
        .iter()
        .find(|kv| kv.key == "service.name")
        .and_then(|kv| match kv.value.as_ref()?.value.as_ref()? {
            Value::StringValue(s) => Some(s.clone()),
            _ => None,
        })
}

#[cfg(feature = "http-proto")]
mod over_http {
    use super::*;
    use async_trait::async_trait;
    use otellogs_http::{Bytes, HttpClient, HttpError, Request, Response};
    use otellogs_otlp::{OtlpLogExporter, WithExportConfig, WithHttpConfig};
    use prost::Message;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Default)]
    struct Collector {
        requests: Arc<Mutex<Vec<Request<Bytes>>>>,
    }

    #[async_trait]
    impl HttpClient for Collector {
        async fn send_bytes(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
            self.requests.lock().unwrap().push(request);
            Ok(Response::builder().status(200).body(Bytes::new())?)
        }
    }

    #[test]
    fn batch_processor_delivers_every_record() {
        let collector = Collector::default();
        let exporter = OtlpLogExporter::builder()
            .with_http()
            .with_endpoint("http://collector:4318/v1/logs")
            .with_http_client(collector.clone())
            .build()
            .unwrap();
        futures_executor::block_on(exporter.start()).unwrap();

        let provider = SdkLoggerProvider::builder()
            .with_resource(Resource::builder().with_service_name("billing").build())
            .with_batch_exporter(exporter)
            .build();
        emit(&provider, &["one", "two", "three"]);
        provider.shutdown().unwrap();

        let requests = collector.requests.lock().unwrap();
        assert!(!requests.is_empty());
        for request in requests.iter() {
            assert_eq!(request.uri(), "http://collector:4318/v1/logs");
            assert_eq!(
                request.headers().get("content-type").unwrap(),
                "application/x-protobuf"
            );
        }

        let decoded: Vec<_> = requests
            .iter()
            .map(|r| ExportLogsServiceRequest::decode(r.body().clone()).unwrap())
            .collect();
        assert_eq!(bodies(&decoded), ["one", "two", "three"]);
        assert_eq!(service_name(&decoded[0]).as_deref(), Some("billing"));
    }

    #[test]
    fn simple_processor_delivers_outside_a_runtime() {
        let collector = Collector::default();
        let exporter = OtlpLogExporter::builder()
            .with_http()
            .with_http_client(collector.clone())
            .build()
            .unwrap();

        let provider = SdkLoggerProvider::builder()
            .with_simple_exporter(exporter)
            .build();
        emit(&provider, &["sync one", "sync two"]);
        provider.shutdown().unwrap();

        let requests = collector.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        let decoded: Vec<_> = requests
            .iter()
            .map(|r| ExportLogsServiceRequest::decode(r.body().clone()).unwrap())
            .collect();
        assert_eq!(bodies(&decoded), ["sync one", "sync two"]);
    }

    #[test]
    fn http_uploads_do_not_wait_for_start() {
        let collector = Collector::default();
        let exporter = OtlpLogExporter::builder()
            .with_http()
            .with_http_client(collector.clone())
            .build()
            .unwrap();

        // The HTTP client holds no connection to open.
        let provider = SdkLoggerProvider::builder()
            .with_batch_exporter(exporter)
            .build();
        emit(&provider, &["early"]);
        provider.shutdown().unwrap();

        assert_eq!(collector.requests.lock().unwrap().len(), 1);
    }
}

#[cfg(feature = "grpc-tonic")]
mod over_grpc {
    use super::*;
    use opentelemetry_proto::tonic::collector::logs::v1::{
        logs_service_server::{LogsService, LogsServiceServer},
        ExportLogsServiceResponse,
    };
    use otellogs_otlp::{OtlpLogExporter, WithExportConfig};
    use std::sync::{Arc, Mutex};
    use tokio_stream::wrappers::TcpListenerStream;

    #[derive(Clone, Default)]
    struct Collector {
        received: Arc<Mutex<Vec<ExportLogsServiceRequest>>>,
    }

    #[tonic::async_trait]
    impl LogsService for Collector {
        async fn export(
            &self,
            request: tonic::Request<ExportLogsServiceRequest>,
        ) -> Result<tonic::Response<ExportLogsServiceResponse>, tonic::Status> {
            self.received.lock().unwrap().push(request.into_inner());
            Ok(tonic::Response::new(ExportLogsServiceResponse::default()))
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn batch_processor_delivers_over_grpc() {
        let collector = Collector::default();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let service = LogsServiceServer::new(collector.clone());
        tokio::spawn(async move {
            tonic::transport::Server::builder()
                .add_service(service)
                .serve_with_incoming(TcpListenerStream::new(listener))
                .await
                .expect("collector to serve");
        });

        let exporter = OtlpLogExporter::builder()
            .with_tonic()
            .with_endpoint(format!("http://{addr}"))
            .build()
            .unwrap();
        exporter.start().await.unwrap();

        let provider = SdkLoggerProvider::builder()
            .with_resource(Resource::builder().with_service_name("search").build())
            .with_batch_exporter(exporter)
            .build();

        tokio::task::spawn_blocking(move || {
            emit(&provider, &["alpha", "beta"]);
            provider.shutdown()
        })
        .await
        .unwrap()
        .unwrap();

        let received = collector.received.lock().unwrap();
        assert_eq!(bodies(&received), ["alpha", "beta"]);
        assert_eq!(service_name(&received[0]).as_deref(), Some("search"));
    }
}
