//! Conversion of SDK log records into OTLP protobuf messages.
//!
//! [`resource_logs`] is what the exporter sends: one `ResourceLogs` per
//! record. [`group_by_resource_and_scope`] produces the compact form for
//! callers that build requests themselves.
mod common;
mod logs;

pub use logs::{group_by_resource_and_scope, log_record, resource_logs};
