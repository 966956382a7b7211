use super::common::{resource_attributes, scope_to_proto, to_nanos, Attributes};
use opentelemetry_proto::tonic::{
    logs::v1::{LogRecord, ResourceLogs, ScopeLogs, SeverityNumber},
    resource::v1::Resource as ProtoResource,
};
use otellogs::InstrumentationScope;
use otellogs_sdk::logs::{LogBatch, LogData};
use otellogs_sdk::Resource;

/// Converts one record into its wire form.
///
/// The wire time is the event time when the source gave one, otherwise the
/// observed time.
pub fn log_record(data: &LogData) -> LogRecord {
    let trace_context = data.trace_context();

    LogRecord {
        time_unix_nano: to_nanos(data.effective_timestamp()),
        observed_time_unix_nano: to_nanos(data.observed_timestamp()),
        severity_number: data
            .severity_number()
            .map(|severity| severity.number())
            .unwrap_or(SeverityNumber::Unspecified as i32),
        severity_text: data.severity_text().unwrap_or_default().to_string(),
        body: data.body().map(super::common::value_to_proto),
        attributes: data
            .attributes()
            .iter()
            .map(|(k, v)| (k, v))
            .collect::<Attributes>()
            .0,
        dropped_attributes_count: 0,
        flags: trace_context
            .and_then(|ctx| ctx.trace_flags)
            .map(|flags| flags.to_u8() as u32)
            .unwrap_or_default(),
        span_id: trace_context
            .map(|ctx| ctx.span_id.to_bytes().to_vec())
            .unwrap_or_default(),
        trace_id: trace_context
            .map(|ctx| ctx.trace_id.to_bytes().to_vec())
            .unwrap_or_default(),
        ..Default::default()
    }
}

fn proto_resource(resource: &Resource) -> ProtoResource {
    ProtoResource {
        attributes: resource_attributes(resource).0,
        dropped_attributes_count: 0,
        ..Default::default()
    }
}

fn scope_logs(scope: &InstrumentationScope, log_records: Vec<LogRecord>) -> ScopeLogs {
    ScopeLogs {
        scope: Some(scope_to_proto(scope)),
        schema_url: scope.schema_url().unwrap_or_default().to_string(),
        log_records,
    }
}

/// One [`ResourceLogs`] per record, each holding a single [`ScopeLogs`] with
/// a single [`LogRecord`]. Records are not merged even when they share a
/// resource or a scope.
pub fn resource_logs(batch: &LogBatch<'_>) -> Vec<ResourceLogs> {
    batch
        .iter()
        .map(|data| ResourceLogs {
            resource: Some(proto_resource(data.resource())),
            scope_logs: vec![scope_logs(
                data.instrumentation_scope(),
                vec![log_record(data)],
            )],
            schema_url: data.resource().schema_url().unwrap_or_default().to_string(),
        })
        .collect()
}

/// Groups the batch by resource and then by instrumentation scope.
///
/// Groups appear in first-seen order and records keep their batch order
/// inside each scope.
pub fn group_by_resource_and_scope(batch: &LogBatch<'_>) -> Vec<ResourceLogs> {
    let mut groups: Vec<(&Resource, Vec<(&InstrumentationScope, Vec<LogRecord>)>)> = Vec::new();

    for data in batch.iter() {
        let resource = data.resource();
        let scope = data.instrumentation_scope();

        let scopes = match groups
            .iter()
            .position(|(r, _)| std::ptr::eq(*r, resource) || *r == resource)
        {
            Some(idx) => &mut groups[idx].1,
            None => {
                groups.push((resource, Vec::new()));
                let last = groups.len() - 1;
                &mut groups[last].1
            }
        };

        match scopes.iter_mut().find(|(s, _)| *s == scope) {
            Some((_, records)) => records.push(log_record(data)),
            None => scopes.push((scope, vec![log_record(data)])),
        }
    }

    groups
        .into_iter()
        .map(|(resource, scopes)| ResourceLogs {
            resource: Some(proto_resource(resource)),
            scope_logs: scopes
                .into_iter()
                .map(|(scope, records)| scope_logs(scope, records))
                .collect(),
            schema_url: resource.schema_url().unwrap_or_default().to_string(),
        })
        .collect()
}
