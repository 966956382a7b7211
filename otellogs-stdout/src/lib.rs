//! Export logs to stdout.
//!
//! # Examples
//!
//! ```no_run
//! use otellogs::logs::{LogRecord, Logger, LoggerProvider, Severity};
//! use otellogs_sdk::logs::SdkLoggerProvider;
//!
//! let provider = SdkLoggerProvider::builder()
//!     .with_simple_exporter(otellogs_stdout::LogExporter::default())
//!     .build();
//!
//! let logger = provider.logger("example");
//! let mut record = logger.create_log_record();
//! record.set_severity_number(Severity::Info);
//! record.set_body("hello".into());
//! logger.emit(record);
//!
//! // {"timeUnixNano":1700000000000000000,"time":"2023-11-14T22:13:20.000000000Z",...
//! ```
#![warn(missing_debug_implementations, missing_docs)]

pub(crate) mod common;

mod logs;
pub use logs::*;
