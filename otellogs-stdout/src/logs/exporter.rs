use core::fmt;
use std::io::{stdout, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use otellogs::otel_debug;
use otellogs_sdk::error::{SdkError, SdkResult};
use otellogs_sdk::logs::LogBatch;

use super::transform::LogRecord;

/// A log exporter that writes one JSON object per record to [`Stdout`] or
/// any other [`Write`].
///
/// Batches exported after [`shutdown`] are dropped without writing.
///
/// [`shutdown`]: otellogs_sdk::logs::LogExporter::shutdown
pub struct LogExporter<W = Stdout> {
    writer: Mutex<W>,
    pretty_print: bool,
    is_shutdown: AtomicBool,
}

impl Default for LogExporter<Stdout> {
    fn default() -> Self {
        LogExporter::new(stdout())
    }
}

impl<W> fmt::Debug for LogExporter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogExporter")
            .field("pretty_print", &self.pretty_print)
            .field("is_shutdown", &self.is_shutdown.load(Ordering::Relaxed))
            .finish()
    }
}

impl<W: Write> LogExporter<W> {
    /// Writes to `writer`, one compact JSON line per record.
    pub fn new(writer: W) -> Self {
        LogExporter {
            writer: Mutex::new(writer),
            pretty_print: false,
            is_shutdown: AtomicBool::new(false),
        }
    }

    /// Indent the JSON output.
    pub fn with_pretty_print(mut self, pretty_print: bool) -> Self {
        self.pretty_print = pretty_print;
        self
    }

    /// Consumes the exporter and returns its writer.
    pub fn into_writer(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_batch(&self, batch: &LogBatch<'_>) -> SdkResult {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| SdkError::InternalFailure(format!("writer lock poisoned: {e}")))?;

        for log in batch.iter() {
            let record = LogRecord::from(log);
            let written = if self.pretty_print {
                serde_json::to_writer_pretty(&mut *writer, &record)
            } else {
                serde_json::to_writer(&mut *writer, &record)
            };
            written.map_err(|e| SdkError::InternalFailure(e.to_string()))?;
            writer
                .write_all(b"\n")
                .map_err(|e| SdkError::InternalFailure(e.to_string()))?;
        }

        writer
            .flush()
            .map_err(|e| SdkError::InternalFailure(e.to_string()))
    }
}

impl<W> otellogs_sdk::logs::LogExporter for LogExporter<W>
where
    W: Write + Send + 'static,
{
    #[allow(clippy::manual_async_fn)]
    fn export(&self, batch: LogBatch<'_>) -> impl std::future::Future<Output = SdkResult> + Send {
        async move {
            if self.is_shutdown.load(Ordering::SeqCst) {
                otel_debug!(name: "StdoutLogExporter.DroppedAfterShutdown", count = batch.len() as u64);
                return Ok(());
            }
            if batch.is_empty() {
                return Ok(());
            }
            self.write_batch(&batch)
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn shutdown(&self) -> impl std::future::Future<Output = SdkResult> + Send {
        async move {
            self.is_shutdown.store(true, Ordering::SeqCst);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otellogs::logs::{AnyValue, LogRecord as _, Severity};
    use otellogs::{InstrumentationScope, KeyValue, SpanId, TraceFlags, TraceId};
    use otellogs_sdk::logs::{LogData, LogExporter as _, SdkLogRecord};
    use otellogs_sdk::Resource;
    use serde_json::Value as Json;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    fn log(severity: Option<Severity>, body: &'static str) -> Arc<LogData> {
        let mut record = SdkLogRecord::new();
        if let Some(severity) = severity {
            record.set_severity_number(severity);
        }
        record.set_body(body.into());
        record.set_timestamp(SystemTime::UNIX_EPOCH + Duration::from_secs(1));
        record.add_attribute("user", "ana");
        let resource = Resource::builder_empty()
            .with_attributes([KeyValue::new("service.name", "billing")])
            .build();
        let scope = InstrumentationScope::builder("payments")
            .with_version("1.2.0")
            .build();
        Arc::new(LogData::new(record, Arc::new(resource), Arc::new(scope)))
    }

    fn lines(exporter: LogExporter<Vec<u8>>) -> Vec<Json> {
        let out = String::from_utf8(exporter.into_writer()).unwrap();
        out.lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn writes_one_json_line_per_record() {
        let exporter = LogExporter::new(Vec::new());
        let logs = [log(Some(Severity::Warn2), "first"), log(None, "second")];

        futures_executor::block_on(exporter.export(LogBatch::new(&logs))).unwrap();

        let lines = lines(exporter);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["severity"], "WARN");
        assert_eq!(lines[0]["severityNumber"], 14);
        assert_eq!(lines[0]["body"]["stringValue"], "first");
        assert_eq!(lines[0]["time"], "1970-01-01T00:00:01.000000000Z");
        assert_eq!(lines[0]["timeUnixNano"], 1_000_000_000u64);
        assert_eq!(lines[0]["attributes"][0]["key"], "user");
        assert_eq!(lines[0]["resource"]["attributes"][0]["value"]["stringValue"], "billing");
        assert_eq!(lines[0]["scope"]["version"], "1.2.0");
        assert_eq!(lines[1]["severity"], "UNSPECIFIED");
        assert!(lines[1].get("traceId").is_none());
    }

    #[test]
    fn trace_context_is_written_as_hex() {
        let mut record = SdkLogRecord::new();
        record.set_trace_context(
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap(),
            SpanId::from_hex("00f067aa0ba902b7").unwrap(),
            Some(TraceFlags::SAMPLED),
        );
        let logs = [Arc::new(LogData::new(
            record,
            Arc::new(Resource::empty()),
            Arc::new(InstrumentationScope::default()),
        ))];
        let exporter = LogExporter::new(Vec::new());

        futures_executor::block_on(exporter.export(LogBatch::new(&logs))).unwrap();

        let lines = lines(exporter);
        assert_eq!(lines[0]["traceId"], "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(lines[0]["spanId"], "00f067aa0ba902b7");
        assert_eq!(lines[0]["flags"], 1);
    }

    #[test]
    fn pretty_print_spans_lines() {
        let exporter = LogExporter::new(Vec::new()).with_pretty_print(true);
        let logs = [log(Some(Severity::Info), "pretty")];

        futures_executor::block_on(exporter.export(LogBatch::new(&logs))).unwrap();

        let out = String::from_utf8(exporter.into_writer()).unwrap();
        assert!(out.lines().count() > 1);
        let parsed: Json = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["body"]["stringValue"], "pretty");
    }

    #[test]
    fn empty_batch_writes_nothing() {
        let exporter = LogExporter::new(Vec::new());

        futures_executor::block_on(exporter.export(LogBatch::new(&[]))).unwrap();

        assert!(exporter.into_writer().is_empty());
    }

    #[test]
    fn batches_after_shutdown_are_dropped() {
        let exporter = LogExporter::new(Vec::new());
        let logs = [log(None, "late")];

        futures_executor::block_on(exporter.shutdown()).unwrap();
        futures_executor::block_on(exporter.export(LogBatch::new(&logs))).unwrap();

        assert!(exporter.into_writer().is_empty());
    }

    #[test]
    fn nested_bodies_keep_their_shape() {
        let mut record = SdkLogRecord::new();
        record.set_body(AnyValue::Map(vec![(
            "items".into(),
            AnyValue::ListAny(vec![AnyValue::Int(1), AnyValue::Null]),
        )]));
        let logs = [Arc::new(LogData::new(
            record,
            Arc::new(Resource::empty()),
            Arc::new(InstrumentationScope::default()),
        ))];
        let exporter = LogExporter::new(Vec::new());

        futures_executor::block_on(exporter.export(LogBatch::new(&logs))).unwrap();

        let lines = lines(exporter);
        let items = &lines[0]["body"]["kvListValue"][0];
        assert_eq!(items["key"], "items");
        assert_eq!(items["value"]["arrayValue"][0]["intValue"], 1);
        assert_eq!(items["value"]["arrayValue"][1], "nullValue");
    }
}
