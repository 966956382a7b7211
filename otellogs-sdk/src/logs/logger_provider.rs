use super::{BatchLogProcessor, LogProcessor, SdkLogger, SimpleLogProcessor};
use crate::error::{SdkError, SdkResult};
use crate::logs::log_processor::DEFAULT_PROCESSOR_TIMEOUT;
use crate::logs::{LogData, LogExporter};
use crate::Resource;
use otellogs::{otel_debug, otel_info, InstrumentationScope};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// A registered processor plus the guard that lets its shutdown run once.
#[derive(Debug)]
pub(crate) struct ProcessorState {
    processor: Box<dyn LogProcessor>,
    is_shutdown: AtomicBool,
}

impl ProcessorState {
    fn new(processor: Box<dyn LogProcessor>) -> Self {
        ProcessorState {
            processor,
            is_shutdown: AtomicBool::new(false),
        }
    }

    pub(crate) fn emit(&self, data: &Arc<LogData>) {
        self.processor.emit(data);
    }

    fn force_flush(&self, timeout: Duration) -> SdkResult {
        self.processor.force_flush_with_timeout(timeout)
    }

    fn shutdown(&self, timeout: Duration) -> SdkResult {
        if self
            .is_shutdown
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }
        self.processor.shutdown_with_timeout(timeout)
    }
}

#[derive(Debug, Clone)]
/// Handles the creation and coordination of [`Logger`]s.
///
/// All `Logger`s created by a `SdkLoggerProvider` share the same
/// [`Resource`] and hand their records to the configured processors. Cloning
/// returns a new handle to the same provider. Dropping the last handle, and
/// every logger created from it, shuts the provider down if
/// [`shutdown`](SdkLoggerProvider::shutdown) was not called before.
///
/// [`Logger`]: otellogs::logs::Logger
pub struct SdkLoggerProvider {
    inner: Arc<LoggerProviderInner>,
}

impl otellogs::logs::LoggerProvider for SdkLoggerProvider {
    type Logger = SdkLogger;

    fn logger_with_scope(&self, scope: InstrumentationScope) -> Self::Logger {
        if scope.name().is_empty() {
            otel_info!(
                name: "LoggerNameEmpty",
                message = "Logger name is empty; consider providing a meaningful name."
            );
        }
        otel_debug!(name: "LoggerProvider.NewLoggerReturned", logger_name = scope.name());
        SdkLogger::new(scope, self.clone())
    }
}

impl SdkLoggerProvider {
    /// Create a new `LoggerProvider` builder.
    pub fn builder() -> LoggerProviderBuilder {
        LoggerProviderBuilder::default()
    }

    /// The resource attached to every record of this provider.
    pub fn resource(&self) -> &Resource {
        &self.inner.resource
    }

    pub(crate) fn shared_resource(&self) -> Arc<Resource> {
        Arc::clone(&self.inner.resource)
    }

    /// Snapshot of the processor list. Empty once the provider is shut down.
    pub(crate) fn processors(&self) -> Arc<[ProcessorState]> {
        self.inner.processors()
    }

    /// Flushes every processor in registration order with a 5 second budget.
    pub fn force_flush(&self) -> SdkResult {
        self.force_flush_with_timeout(DEFAULT_PROCESSOR_TIMEOUT)
    }

    /// Flushes every processor in registration order and stops at the first
    /// error. `timeout` bounds the whole call.
    pub fn force_flush_with_timeout(&self, timeout: Duration) -> SdkResult {
        let deadline = Instant::now() + timeout;
        for state in self.processors().iter() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SdkError::Timeout(timeout));
            }
            state.force_flush(remaining)?;
        }
        Ok(())
    }

    /// Shuts down every processor with a 5 second budget.
    pub fn shutdown(&self) -> SdkResult {
        self.shutdown_with_timeout(DEFAULT_PROCESSOR_TIMEOUT)
    }

    /// Shuts down every processor in registration order and reports all of
    /// their failures. Only the first call does any work; later calls return
    /// `Ok(())`.
    pub fn shutdown_with_timeout(&self, timeout: Duration) -> SdkResult {
        otel_debug!(name: "LoggerProvider.ShutdownInvokedByUser");
        self.inner.shutdown(timeout)
    }
}

#[derive(Debug)]
struct LoggerProviderInner {
    processors: RwLock<Arc<[ProcessorState]>>,
    resource: Arc<Resource>,
    is_shutdown: AtomicBool,
}

impl LoggerProviderInner {
    fn processors(&self) -> Arc<[ProcessorState]> {
        match self.processors.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn shutdown(&self, timeout: Duration) -> SdkResult {
        if self
            .is_shutdown
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            otel_debug!(name: "LoggerProvider.Shutdown.AlreadyShutdown");
            return Ok(());
        }

        let deadline = Instant::now() + timeout;
        let mut errors = Vec::new();
        for state in self.processors().iter() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if let Err(err) = state.shutdown(remaining) {
                otel_debug!(name: "LoggerProvider.ShutdownError", error = format!("{err}"));
                errors.push(err);
            }
        }

        let emptied: Arc<[ProcessorState]> = Arc::from(Vec::new());
        match self.processors.write() {
            Ok(mut guard) => *guard = emptied,
            Err(poisoned) => *poisoned.into_inner() = emptied,
        }

        join_errors(errors)
    }
}

fn join_errors(mut errors: Vec<SdkError>) -> SdkResult {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(SdkError::InternalFailure(
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        )),
    }
}

impl Drop for LoggerProviderInner {
    fn drop(&mut self) {
        if self.is_shutdown.load(Ordering::Acquire) {
            otel_debug!(name: "LoggerProvider.Drop.AlreadyShutdown");
            return;
        }
        otel_info!(
            name: "LoggerProvider.Drop",
            message = "Last reference of LoggerProvider dropped, initiating shutdown."
        );
        let _ = self.shutdown(DEFAULT_PROCESSOR_TIMEOUT);
    }
}

#[derive(Debug, Default)]
/// Builder for [`SdkLoggerProvider`].
pub struct LoggerProviderBuilder {
    processors: Vec<Box<dyn LogProcessor>>,
    resource: Option<Resource>,
}

impl LoggerProviderBuilder {
    /// Adds a [`SimpleLogProcessor`] wrapping `exporter`.
    ///
    /// Processors are invoked in the order they are added.
    pub fn with_simple_exporter<T: LogExporter + 'static>(self, exporter: T) -> Self {
        self.with_log_processor(SimpleLogProcessor::new(exporter))
    }

    /// Adds a [`BatchLogProcessor`] with the default [`BatchConfig`] wrapping
    /// `exporter`.
    ///
    /// [`BatchConfig`]: crate::logs::BatchConfig
    pub fn with_batch_exporter<T: LogExporter + 'static>(self, exporter: T) -> Self {
        self.with_log_processor(BatchLogProcessor::builder(exporter).build())
    }

    /// Adds a custom [`LogProcessor`].
    pub fn with_log_processor<T: LogProcessor + 'static>(mut self, processor: T) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// The `Resource` attached to every record. Defaults to
    /// [`Resource::default`].
    pub fn with_resource(self, resource: Resource) -> Self {
        LoggerProviderBuilder {
            resource: Some(resource),
            ..self
        }
    }

    /// Create a new provider from this configuration.
    pub fn build(self) -> SdkLoggerProvider {
        let processors: Vec<ProcessorState> =
            self.processors.into_iter().map(ProcessorState::new).collect();
        otel_debug!(name: "LoggerProvider.Built", processor_count = processors.len());

        SdkLoggerProvider {
            inner: Arc::new(LoggerProviderInner {
                processors: RwLock::new(Arc::from(processors)),
                resource: Arc::new(self.resource.unwrap_or_default()),
                is_shutdown: AtomicBool::new(false),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::{InMemoryLogExporter, SdkLogRecord};
    use crate::resource::SERVICE_NAME;
    use otellogs::logs::{AnyValue, LogRecord as _, Logger, LoggerProvider, Severity};
    use otellogs::{KeyValue, SpanId, TraceId};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::thread;

    #[derive(Debug, Default, Clone)]
    struct Counters {
        emitted: Arc<AtomicUsize>,
        flushed: Arc<AtomicUsize>,
        shutdowns: Arc<AtomicUsize>,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    #[derive(Debug)]
    struct ScriptedProcessor {
        name: &'static str,
        counters: Counters,
        flush_result: SdkResult,
        shutdown_result: SdkResult,
        flush_delay: Duration,
    }

    impl ScriptedProcessor {
        fn ok(name: &'static str, counters: &Counters) -> Self {
            ScriptedProcessor {
                name,
                counters: counters.clone(),
                flush_result: Ok(()),
                shutdown_result: Ok(()),
                flush_delay: Duration::ZERO,
            }
        }
    }

    impl LogProcessor for ScriptedProcessor {
        fn emit(&self, _data: &Arc<LogData>) {
            self.counters.emitted.fetch_add(1, Ordering::SeqCst);
        }

        fn force_flush_with_timeout(&self, _timeout: Duration) -> SdkResult {
            thread::sleep(self.flush_delay);
            self.counters.flushed.fetch_add(1, Ordering::SeqCst);
            self.counters.order.lock().unwrap().push(self.name);
            self.flush_result.clone()
        }

        fn shutdown_with_timeout(&self, _timeout: Duration) -> SdkResult {
            self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
            self.counters.order.lock().unwrap().push(self.name);
            self.shutdown_result.clone()
        }
    }

    #[test]
    fn default_resource_is_attached_to_records() {
        let exporter = InMemoryLogExporter::default();
        let provider = SdkLoggerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        assert_eq!(
            provider.resource().get(SERVICE_NAME),
            Some(&AnyValue::from("unknown_service"))
        );

        let logger = provider.logger("resource-test");
        logger.emit(logger.create_log_record());

        let emitted = exporter.get_emitted_logs().unwrap();
        assert_eq!(
            emitted[0].resource().get(SERVICE_NAME),
            Some(&AnyValue::from("unknown_service"))
        );
        assert_eq!(emitted[0].instrumentation_scope().name(), "resource-test");
    }

    #[test]
    fn custom_resource_replaces_the_default() {
        let provider = SdkLoggerProvider::builder()
            .with_resource(
                Resource::builder_empty()
                    .with_service_name("checkout")
                    .with_attribute(KeyValue::new("region", "eu-west-1"))
                    .build(),
            )
            .build();
        assert_eq!(provider.resource().len(), 2);
        assert_eq!(
            provider.resource().get(SERVICE_NAME),
            Some(&AnyValue::from("checkout"))
        );
    }

    #[test]
    fn emitted_record_keeps_every_field() {
        let exporter = InMemoryLogExporter::default();
        let provider = SdkLoggerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let logger = provider.logger_with_scope(
            InstrumentationScope::builder("payments")
                .with_version("1.2.0")
                .build(),
        );

        let mut record = logger.create_log_record();
        record.set_severity_number(Severity::Warn);
        record.set_severity_text("WARN".into());
        record.set_body("card declined".into());
        record.add_attribute("attempt", 2);
        record.add_attribute("attempt", 3);
        record.set_trace_context(TraceId::from(7), SpanId::from(9), None);
        logger.emit(record);

        let emitted = exporter.get_emitted_logs().unwrap();
        let data = &emitted[0];
        assert_eq!(data.severity_number(), Some(Severity::Warn));
        assert_eq!(data.severity_text(), Some("WARN"));
        assert_eq!(data.body(), Some(&AnyValue::from("card declined")));
        assert_eq!(data.attributes().len(), 2);
        assert_eq!(data.trace_context().unwrap().trace_id, TraceId::from(7));
        assert_eq!(data.instrumentation_scope().version(), Some("1.2.0"));
    }

    #[test]
    fn emit_stamps_observed_time_when_unset() {
        let exporter = InMemoryLogExporter::default();
        let provider = SdkLoggerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let logger = provider.logger("observed");

        let before = std::time::SystemTime::now();
        logger.emit(SdkLogRecord::new());

        let emitted = exporter.get_emitted_logs().unwrap();
        assert!(emitted[0].observed_timestamp() >= before);
        assert!(emitted[0].timestamp().is_none());
    }

    #[test]
    fn shutdown_runs_every_processor_once() {
        let counters = Counters::default();
        let provider = SdkLoggerProvider::builder()
            .with_log_processor(ScriptedProcessor::ok("first", &counters))
            .with_log_processor(ScriptedProcessor::ok("second", &counters))
            .build();

        let logger = provider.logger("shutdown");
        logger.emit(logger.create_log_record());
        assert_eq!(counters.emitted.load(Ordering::SeqCst), 2);

        assert_eq!(provider.shutdown(), Ok(()));
        assert_eq!(provider.shutdown(), Ok(()));
        logger.emit(logger.create_log_record());

        assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 2);
        assert_eq!(counters.emitted.load(Ordering::SeqCst), 2);
        assert_eq!(*counters.order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn shutdown_joins_all_errors() {
        let counters = Counters::default();
        let provider = SdkLoggerProvider::builder()
            .with_log_processor(ScriptedProcessor {
                shutdown_result: Err(SdkError::InternalFailure("a".into())),
                ..ScriptedProcessor::ok("first", &counters)
            })
            .with_log_processor(ScriptedProcessor::ok("second", &counters))
            .with_log_processor(ScriptedProcessor {
                shutdown_result: Err(SdkError::InternalFailure("b".into())),
                ..ScriptedProcessor::ok("third", &counters)
            })
            .build();

        let err = provider.shutdown().unwrap_err();
        assert_eq!(
            err,
            SdkError::InternalFailure("Operation failed: a; Operation failed: b".into())
        );
        assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn single_shutdown_error_is_returned_unchanged() {
        let counters = Counters::default();
        let provider = SdkLoggerProvider::builder()
            .with_log_processor(ScriptedProcessor {
                shutdown_result: Err(SdkError::Timeout(Duration::from_secs(1))),
                ..ScriptedProcessor::ok("only", &counters)
            })
            .build();

        assert_eq!(
            provider.shutdown(),
            Err(SdkError::Timeout(Duration::from_secs(1)))
        );
    }

    #[test]
    fn concurrent_shutdown_reaches_processors_once() {
        let counters = Counters::default();
        let provider = SdkLoggerProvider::builder()
            .with_log_processor(ScriptedProcessor::ok("only", &counters))
            .build();

        let results: Vec<SdkResult> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4).map(|_| scope.spawn(|| provider.shutdown())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn force_flush_stops_at_first_error() {
        let counters = Counters::default();
        let provider = SdkLoggerProvider::builder()
            .with_log_processor(ScriptedProcessor {
                flush_result: Err(SdkError::InternalFailure("first failed".into())),
                ..ScriptedProcessor::ok("first", &counters)
            })
            .with_log_processor(ScriptedProcessor::ok("second", &counters))
            .build();

        assert_eq!(
            provider.force_flush(),
            Err(SdkError::InternalFailure("first failed".into()))
        );
        assert_eq!(*counters.order.lock().unwrap(), vec!["first"]);
    }

    #[test]
    fn force_flush_checks_the_deadline_between_processors() {
        let counters = Counters::default();
        let provider = SdkLoggerProvider::builder()
            .with_log_processor(ScriptedProcessor {
                flush_delay: Duration::from_millis(100),
                ..ScriptedProcessor::ok("slow", &counters)
            })
            .with_log_processor(ScriptedProcessor::ok("skipped", &counters))
            .build();

        let timeout = Duration::from_millis(20);
        assert_eq!(
            provider.force_flush_with_timeout(timeout),
            Err(SdkError::Timeout(timeout))
        );
        assert_eq!(counters.flushed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn force_flush_without_processors_is_ok() {
        let provider = SdkLoggerProvider::builder().build();
        assert_eq!(provider.force_flush(), Ok(()));
    }

    #[test]
    fn dropping_the_last_handle_shuts_down() {
        let counters = Counters::default();
        let provider = SdkLoggerProvider::builder()
            .with_log_processor(ScriptedProcessor::ok("only", &counters))
            .build();
        let clone = provider.clone();
        let logger = provider.logger("drop");

        drop(provider);
        assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 0);
        drop(clone);
        assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 0);
        drop(logger);
        assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_after_shutdown_does_not_shut_down_again() {
        let counters = Counters::default();
        let provider = SdkLoggerProvider::builder()
            .with_log_processor(ScriptedProcessor::ok("only", &counters))
            .build();

        provider.shutdown().unwrap();
        drop(provider);
        assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn batch_exporter_flushes_on_provider_shutdown() {
        let exporter = InMemoryLogExporter::default();
        let provider = SdkLoggerProvider::builder()
            .with_batch_exporter(exporter.clone())
            .build();
        let logger = provider.logger("batched");
        for _ in 0..3 {
            logger.emit(logger.create_log_record());
        }

        provider.shutdown().unwrap();
        assert_eq!(exporter.get_emitted_logs().unwrap().len(), 3);
        assert_eq!(exporter.shutdown_count().unwrap(), 1);
    }
}
