//! Implements the Logs Bridge API used by `otellogs`.
//!
//! This crate is the producer-facing half of the logs pipeline. It defines the
//! vocabulary shared by appenders, the SDK and exporters:
//!
//! - [`logs::LogRecord`], [`logs::Logger`] and [`logs::LoggerProvider`], the
//!   traits an appender uses to build and emit records.
//! - [`logs::AnyValue`], the tagged value carried by record bodies and
//!   attributes, together with [`logs::serialize`], which encodes any
//!   `serde::Serialize` value into an [`logs::AnyValue`] tree.
//! - [`logs::Severity`], the normalized 1 to 24 severity scale.
//! - [`TraceId`], [`SpanId`] and [`TraceFlags`] for trace correlation.
//! - [`InstrumentationScope`], naming the library that produced a record.
//! - [`global`], an explicitly installed process-wide provider handle and
//!   error handler, both with inert defaults.
//!
//! The processing and exporting of records lives in `otellogs_sdk` and the
//! exporter crates. Libraries that only emit logs should depend on this crate
//! alone.
//!
//! ```
//! use otellogs::logs::{AnyValue, LogRecord, Logger, LoggerProvider, NoopLoggerProvider, Severity};
//!
//! let provider = NoopLoggerProvider::new();
//! let logger = provider.logger("my-component");
//!
//! let mut record = logger.create_log_record();
//! record.set_severity_number(Severity::Info);
//! record.set_body(AnyValue::from("hello"));
//! record.add_attribute("user.id", 42);
//! logger.emit(record);
//! ```
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]
#![cfg_attr(test, deny(warnings))]

mod common;
pub use common::{InstrumentationScope, InstrumentationScopeBuilder, Key, KeyValue};

mod trace_context;
pub use trace_context::{SpanId, TraceFlags, TraceId};

pub mod global;

pub mod logs;

#[doc(hidden)]
#[cfg(feature = "internal-logs")]
pub mod _private {
    pub use tracing::{debug, error, info, warn}; // re-export
}
