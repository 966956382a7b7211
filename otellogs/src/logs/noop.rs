use std::{borrow::Cow, time::SystemTime};

use crate::{
    logs::{AnyValue, LogRecord, Logger, LoggerProvider, Severity},
    InstrumentationScope, Key, SpanId, TraceFlags, TraceId,
};

/// A [`LoggerProvider`] whose loggers discard everything.
///
/// This is what the global provider hands out until one is installed.
#[derive(Clone, Debug, Default)]
pub struct NoopLoggerProvider(());

impl NoopLoggerProvider {
    /// Create a new no-op logger provider.
    pub fn new() -> Self {
        NoopLoggerProvider(())
    }
}

impl LoggerProvider for NoopLoggerProvider {
    type Logger = NoopLogger;

    fn logger_with_scope(&self, _scope: InstrumentationScope) -> Self::Logger {
        NoopLogger(())
    }
}

/// A log record that ignores every setter.
#[derive(Debug, Clone, Default)]
pub struct NoopLogRecord;

impl LogRecord for NoopLogRecord {
    #[inline]
    fn set_timestamp(&mut self, _timestamp: SystemTime) {}
    #[inline]
    fn set_observed_timestamp(&mut self, _timestamp: SystemTime) {}
    #[inline]
    fn set_trace_context(
        &mut self,
        _trace_id: TraceId,
        _span_id: SpanId,
        _trace_flags: Option<TraceFlags>,
    ) {
    }
    #[inline]
    fn set_severity_text(&mut self, _text: Cow<'static, str>) {}
    #[inline]
    fn set_severity_number(&mut self, _number: Severity) {}
    #[inline]
    fn set_body(&mut self, _body: AnyValue) {}
    #[inline]
    fn add_attributes<I, K, V>(&mut self, _attributes: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<AnyValue>,
    {
    }
    #[inline]
    fn add_attribute<K, V>(&mut self, _key: K, _value: V)
    where
        K: Into<Key>,
        V: Into<AnyValue>,
    {
    }
}

/// A [`Logger`] that drops every record.
#[derive(Clone, Debug)]
pub struct NoopLogger(());

impl Logger for NoopLogger {
    type LogRecord = NoopLogRecord;

    fn create_log_record(&self) -> Self::LogRecord {
        NoopLogRecord
    }

    fn emit(&self, _record: Self::LogRecord) {}
}
