use crate::Resource;
use otellogs::{
    logs::{AnyValue, LogRecord, Severity},
    InstrumentationScope, Key, SpanId, TraceFlags, TraceId,
};
use std::{borrow::Cow, sync::Arc, time::SystemTime};

/// The record an appender fills in before emitting it.
///
/// Created by [`SdkLogger`](super::SdkLogger) and frozen into a [`LogData`]
/// on emit.
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct SdkLogRecord {
    /// Record timestamp
    pub timestamp: Option<SystemTime>,

    /// Timestamp for when the record was observed by the pipeline
    pub observed_timestamp: Option<SystemTime>,

    /// Trace context for logs associated with spans
    pub trace_context: Option<TraceContext>,

    /// The original severity string from the source
    pub severity_text: Option<Cow<'static, str>>,

    /// The corresponding severity value, normalized
    pub severity_number: Option<Severity>,

    /// Record body
    pub body: Option<AnyValue>,

    /// Attributes in insertion order; keys may repeat
    pub attributes: Vec<(Key, AnyValue)>,
}

impl SdkLogRecord {
    /// An empty record.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogRecord for SdkLogRecord {
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
        self.trace_context = Some(TraceContext {
            trace_id,
            span_id,
            trace_flags,
        });
    }

    fn set_severity_text(&mut self, severity_text: Cow<'static, str>) {
        self.severity_text = Some(severity_text);
    }

    fn set_severity_number(&mut self, severity_number: Severity) {
        self.severity_number = Some(severity_number);
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

/// TraceContext stores the trace data for logs that have an associated
/// span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct TraceContext {
    /// Trace id
    pub trace_id: TraceId,
    /// Span Id
    pub span_id: SpanId,
    /// Trace flags
    pub trace_flags: Option<TraceFlags>,
}

/// An emitted log record, as handed to processors and exporters.
///
/// `LogData` is immutable: it is shared as `Arc<LogData>` between every
/// processor of a provider, and the observed timestamp is always set.
#[derive(Debug, Clone, PartialEq)]
pub struct LogData {
    record: SdkLogRecord,
    observed_timestamp: SystemTime,
    resource: Arc<Resource>,
    scope: Arc<InstrumentationScope>,
}

impl LogData {
    /// Freezes `record`. The observed timestamp falls back to now when unset.
    pub fn new(
        record: SdkLogRecord,
        resource: Arc<Resource>,
        scope: Arc<InstrumentationScope>,
    ) -> Self {
        let observed_timestamp = record.observed_timestamp.unwrap_or_else(SystemTime::now);
        LogData {
            record,
            observed_timestamp,
            resource,
            scope,
        }
    }

    /// Time the event occurred, if the source provided one.
    pub fn timestamp(&self) -> Option<SystemTime> {
        self.record.timestamp
    }

    /// Time the record entered the pipeline.
    pub fn observed_timestamp(&self) -> SystemTime {
        self.observed_timestamp
    }

    /// The event time if known, otherwise the observed time.
    pub fn effective_timestamp(&self) -> SystemTime {
        self.record.timestamp.unwrap_or(self.observed_timestamp)
    }

    /// Trace correlation, if any.
    pub fn trace_context(&self) -> Option<&TraceContext> {
        self.record.trace_context.as_ref()
    }

    /// Severity text as given by the source.
    pub fn severity_text(&self) -> Option<&str> {
        self.record.severity_text.as_deref()
    }

    /// Normalized severity.
    pub fn severity_number(&self) -> Option<Severity> {
        self.record.severity_number
    }

    /// Record body.
    pub fn body(&self) -> Option<&AnyValue> {
        self.record.body.as_ref()
    }

    /// Attributes in insertion order.
    pub fn attributes(&self) -> &[(Key, AnyValue)] {
        &self.record.attributes
    }

    /// The resource of the provider that emitted the record.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// The scope of the logger that emitted the record.
    pub fn instrumentation_scope(&self) -> &InstrumentationScope {
        &self.scope
    }
}
