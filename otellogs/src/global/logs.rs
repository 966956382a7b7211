use std::{
    borrow::Cow,
    fmt, mem,
    sync::{Arc, RwLock},
    time::SystemTime,
};

use once_cell::sync::Lazy;

use crate::{
    logs::{AnyValue, LogRecord, Logger, LoggerProvider, NoopLoggerProvider, Severity},
    InstrumentationScope, Key, SpanId, TraceFlags, TraceId,
};

/// A record built through the global logger.
///
/// Fields are buffered here and replayed into the installed provider's own
/// record type at emit time.
#[derive(Debug, Clone, Default)]
pub struct GlobalLogRecord {
    timestamp: Option<SystemTime>,
    observed_timestamp: Option<SystemTime>,
    trace_context: Option<(TraceId, SpanId, Option<TraceFlags>)>,
    severity_text: Option<Cow<'static, str>>,
    severity_number: Option<Severity>,
    body: Option<AnyValue>,
    attributes: Vec<(Key, AnyValue)>,
}

impl GlobalLogRecord {
    fn replay_into<R: LogRecord>(self, target: &mut R) {
        if let Some(ts) = self.timestamp {
            target.set_timestamp(ts);
        }
        if let Some(ts) = self.observed_timestamp {
            target.set_observed_timestamp(ts);
        }
        if let Some((trace_id, span_id, flags)) = self.trace_context {
            target.set_trace_context(trace_id, span_id, flags);
        }
        if let Some(text) = self.severity_text {
            target.set_severity_text(text);
        }
        if let Some(number) = self.severity_number {
            target.set_severity_number(number);
        }
        if let Some(body) = self.body {
            target.set_body(body);
        }
        target.add_attributes(self.attributes);
    }
}

impl LogRecord for GlobalLogRecord {
    fn set_timestamp(&mut self, timestamp: SystemTime) {
        self.timestamp = Some(timestamp);
    }

    fn set_observed_timestamp(&mut self, timestamp: SystemTime) {
        self.observed_timestamp = Some(timestamp);
    }

    fn set_trace_context(
        &mut self,
        trace_id: TraceId,
        span_id: SpanId,
        trace_flags: Option<TraceFlags>,
    ) {
        self.trace_context = Some((trace_id, span_id, trace_flags));
    }

    fn set_severity_text(&mut self, text: Cow<'static, str>) {
        self.severity_text = Some(text);
    }

    fn set_severity_number(&mut self, number: Severity) {
        self.severity_number = Some(number);
    }

    fn set_body(&mut self, body: AnyValue) {
        self.body = Some(body);
    }

    fn add_attributes<I, K, V>(&mut self, attributes: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<AnyValue>,
    {
        self.attributes
            .extend(attributes.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    fn add_attribute<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Key>,
        V: Into<AnyValue>,
    {
        self.attributes.push((key.into(), value.into()));
    }
}

/// Object safe view of a [`Logger`].
trait ErasedLogger: Send + Sync {
    fn emit_buffered(&self, record: GlobalLogRecord);
}

impl<L> ErasedLogger for L
where
    L: Logger + Send + Sync,
{
    fn emit_buffered(&self, record: GlobalLogRecord) {
        let mut target = self.create_log_record();
        record.replay_into(&mut target);
        self.emit(target);
    }
}

/// Object safe view of a [`LoggerProvider`].
trait ErasedLoggerProvider: Send + Sync {
    fn boxed_logger(&self, scope: InstrumentationScope) -> Box<dyn ErasedLogger>;
}

impl<L, P> ErasedLoggerProvider for P
where
    L: Logger + Send + Sync + 'static,
    P: LoggerProvider<Logger = L> + Send + Sync,
{
    fn boxed_logger(&self, scope: InstrumentationScope) -> Box<dyn ErasedLogger> {
        Box::new(self.logger_with_scope(scope))
    }
}

/// Logger handed out by the [`GlobalLoggerProvider`].
pub struct BoxedLogger(Box<dyn ErasedLogger>);

impl fmt::Debug for BoxedLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BoxedLogger")
    }
}

impl Logger for BoxedLogger {
    type LogRecord = GlobalLogRecord;

    fn create_log_record(&self) -> Self::LogRecord {
        GlobalLogRecord::default()
    }

    fn emit(&self, record: Self::LogRecord) {
        self.0.emit_buffered(record)
    }
}

/// Represents the globally configured [`LoggerProvider`] instance.
#[derive(Clone)]
pub struct GlobalLoggerProvider {
    provider: Arc<dyn ErasedLoggerProvider>,
}

impl fmt::Debug for GlobalLoggerProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GlobalLoggerProvider")
    }
}

impl GlobalLoggerProvider {
    fn new<L, P>(provider: P) -> Self
    where
        L: Logger + Send + Sync + 'static,
        P: LoggerProvider<Logger = L> + Send + Sync + 'static,
    {
        GlobalLoggerProvider {
            provider: Arc::new(provider),
        }
    }
}

impl LoggerProvider for GlobalLoggerProvider {
    type Logger = BoxedLogger;

    fn logger_with_scope(&self, scope: InstrumentationScope) -> Self::Logger {
        BoxedLogger(self.provider.boxed_logger(scope))
    }
}

static GLOBAL_LOGGER_PROVIDER: Lazy<RwLock<GlobalLoggerProvider>> =
    Lazy::new(|| RwLock::new(GlobalLoggerProvider::new(NoopLoggerProvider::new())));

/// Returns the currently installed provider, or the no-op provider if none
/// was installed.
pub fn logger_provider() -> GlobalLoggerProvider {
    GLOBAL_LOGGER_PROVIDER
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Creates a named [`Logger`] through the global provider.
pub fn logger(name: impl Into<Cow<'static, str>>) -> BoxedLogger {
    logger_provider().logger(name)
}

/// Installs `new_provider` as the global provider, returning the previous one.
pub fn set_logger_provider<L, P>(new_provider: P) -> GlobalLoggerProvider
where
    L: Logger + Send + Sync + 'static,
    P: LoggerProvider<Logger = L> + Send + Sync + 'static,
{
    let mut provider = GLOBAL_LOGGER_PROVIDER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    mem::replace(&mut *provider, GlobalLoggerProvider::new(new_provider))
}

/// Swaps in the no-op provider and releases the global reference to the
/// previous one.
///
/// Providers that shut down when their last handle is dropped, such as the
/// SDK provider, flush and stop here unless the application still holds a
/// clone.
pub fn shutdown_logger_provider() {
    drop(set_logger_provider(NoopLoggerProvider::new()));
}
