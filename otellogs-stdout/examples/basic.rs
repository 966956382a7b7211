//! Emits a few records through a batch processor into the stdout exporter,
//! with the pipeline's own diagnostics printed by a `tracing` subscriber.
use otellogs::logs::{LogRecord, Logger, LoggerProvider, Severity};
use otellogs::KeyValue;
use otellogs_sdk::logs::SdkLoggerProvider;
use otellogs_sdk::Resource;
use tracing_subscriber::filter::LevelFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    let provider = SdkLoggerProvider::builder()
        .with_resource(
            Resource::builder()
                .with_service_name("basic-example")
                .with_attribute(KeyValue::new("deployment.environment", "dev"))
                .build(),
        )
        .with_batch_exporter(otellogs_stdout::LogExporter::default())
        .build();

    let logger = provider.logger("basic");
    for (severity, body) in [
        (Severity::Info, "service started"),
        (Severity::Warn, "cache miss ratio above threshold"),
        (Severity::Error, "upstream refused connection"),
    ] {
        let mut record = logger.create_log_record();
        record.set_severity_number(severity);
        record.set_body(body.into());
        record.add_attribute("example", true);
        logger.emit(record);
    }

    if let Err(err) = provider.shutdown() {
        eprintln!("shutdown failed: {err}");
    }
}
