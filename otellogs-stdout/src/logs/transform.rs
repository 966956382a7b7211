use std::time::SystemTime;

use crate::common::{as_human_readable, as_unix_nano, KeyValue, Resource, Scope, Value};
use otellogs_sdk::logs::LogData;
use serde::Serialize;

/// The line written for one record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LogRecord {
    #[serde(serialize_with = "as_unix_nano")]
    time_unix_nano: SystemTime,
    #[serde(serialize_with = "as_human_readable")]
    time: SystemTime,
    #[serde(serialize_with = "as_unix_nano")]
    observed_time_unix_nano: SystemTime,
    #[serde(serialize_with = "as_human_readable")]
    observed_time: SystemTime,
    severity_number: i32,
    severity: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    severity_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
    attributes: Vec<KeyValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flags: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    span_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace_id: Option<String>,
    resource: Resource,
    scope: Scope,
}

impl From<&LogData> for LogRecord {
    fn from(value: &LogData) -> Self {
        let trace_context = value.trace_context();
        let severity_number = value
            .severity_number()
            .map(|s| s.number())
            .unwrap_or_default();

        LogRecord {
            time_unix_nano: value.effective_timestamp(),
            time: value.effective_timestamp(),
            observed_time_unix_nano: value.observed_timestamp(),
            observed_time: value.observed_timestamp(),
            severity_number,
            severity: severity_range_name(severity_number),
            severity_text: value.severity_text().map(str::to_string),
            body: value.body().map(Into::into),
            attributes: value
                .attributes()
                .iter()
                .map(|(key, value)| KeyValue::new(key.as_str(), value))
                .collect(),
            flags: trace_context.and_then(|c| c.trace_flags.map(|f| f.to_u8())),
            span_id: trace_context.map(|c| c.span_id.to_string()),
            trace_id: trace_context.map(|c| c.trace_id.to_string()),
            resource: value.resource().into(),
            scope: value.instrumentation_scope().into(),
        }
    }
}

/// Name of the severity range `number` falls in.
pub(crate) fn severity_range_name(number: i32) -> &'static str {
    match number {
        1..=4 => "TRACE",
        5..=8 => "DEBUG",
        9..=12 => "INFO",
        13..=16 => "WARN",
        17..=20 => "ERROR",
        21..=24 => "FATAL",
        _ => "UNSPECIFIED",
    }
}
